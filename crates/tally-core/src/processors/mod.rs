//! Built-in order processors.
//!
//! | Processor | Adjustment type | Reads |
//! |-----------|-----------------|-------|
//! | [`PromotionProcessor`] | `Promotion` | valid promotions |
//! | [`FeeProcessor`] | `Fee` | subtotal after promotions |
//! | [`TaxProcessor`] | `Tax` | item totals after promotions |

mod fee;
mod promotion;
mod tax;

pub use fee::FeeProcessor;
pub use promotion::PromotionProcessor;
pub use tax::TaxProcessor;
