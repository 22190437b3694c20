//! Payments, invoices and the balances derived from them.
//!
//! # Modules
//!
//! - `types` - Payment and invoice documents, inputs, `Balance`
//! - `balance` - Trip and invoice-line balance computation
//! - `validation` - Payment line admissibility
//! - `payment` - Payment recording and metadata edits
//! - `invoice` - Invoice assembly and status derivation
//! - `error` - Billing error types

pub mod balance;
pub mod error;
pub mod invoice;
pub mod payment;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod validation_props;

pub use balance::{BalanceCalculator, BalanceScope};
pub use error::BillingError;
pub use invoice::{InvoiceLineView, InvoiceService, InvoiceStatus, InvoiceSummary};
pub use payment::PaymentService;
pub use types::{
    Balance, CreateInvoiceInput, CreatePaymentInput, Invoice, Payment, RequestLine, ShareCode,
    UpdateInvoiceInput, UpdatePaymentInput,
};
pub use validation::{LineRejection, PaymentValidator, RejectionReason};
