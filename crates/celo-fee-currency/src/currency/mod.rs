//! Fee currencies: the currency selector, exact exchange rates, the per-block registry and the
//! value converter built on top of it.

mod context;
pub use context::*;

mod convert;
pub use convert::*;

mod error;
pub use error::*;

mod rate;
pub use rate::ExchangeRate;

mod registry;
pub use registry::*;

mod selector;
pub use selector::*;
