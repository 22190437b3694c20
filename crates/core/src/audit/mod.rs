//! Audit trail and remarks shared by every document type.
//!
//! Trips, vehicles, payments and invoices all carry an append-only `logs`
//! array and an author-scoped `remarks` thread. The behaviour lives here
//! once, behind the [`Auditable`] and [`Remarkable`] capabilities.

pub mod error;
pub mod log;
pub mod remark;

pub use error::AuditError;
pub use log::{Auditable, FieldChange, LogEntry, diff_fields};
pub use remark::{Remark, Remarkable};

/// Implements [`Auditable`] and [`Remarkable`] for a struct with `logs`
/// and `remarks` fields.
#[macro_export]
macro_rules! impl_audit_trail {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::audit::Auditable for $ty {
                fn logs(&self) -> &[$crate::audit::LogEntry] {
                    &self.logs
                }

                fn logs_mut(&mut self) -> &mut Vec<$crate::audit::LogEntry> {
                    &mut self.logs
                }
            }

            impl $crate::audit::Remarkable for $ty {
                fn remarks(&self) -> &[$crate::audit::Remark] {
                    &self.remarks
                }

                fn remarks_mut(&mut self) -> &mut Vec<$crate::audit::Remark> {
                    &mut self.remarks
                }
            }
        )+
    };
}
