use core::fmt;

use alloy_primitives::Address;

/// The currency a transaction pays its fees in.
///
/// Native is represented as `None`. The zero address is folded into native on construction, so
/// two selectors are equal iff both are native or both name the same token.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "Option<Address>", into = "Option<Address>")]
pub struct FeeCurrency(Option<Address>);

impl FeeCurrency {
    /// The native currency.
    pub const NATIVE: Self = Self(None);

    /// Creates a selector from an optional token address. `None` and the zero address both map to
    /// [`FeeCurrency::NATIVE`].
    pub fn new(address: Option<Address>) -> Self {
        Self(address.filter(|address| !address.is_zero()))
    }

    /// Creates a selector for the given token.
    pub fn token(address: Address) -> Self {
        Self::new(Some(address))
    }

    /// Returns `true` if fees are paid in the native currency.
    pub const fn is_native(&self) -> bool {
        self.0.is_none()
    }

    /// The token address, or `None` for the native currency.
    pub const fn address(&self) -> Option<Address> {
        self.0
    }
}

impl From<Option<Address>> for FeeCurrency {
    fn from(address: Option<Address>) -> Self {
        Self::new(address)
    }
}

impl From<FeeCurrency> for Option<Address> {
    fn from(currency: FeeCurrency) -> Self {
        currency.0
    }
}

impl From<Address> for FeeCurrency {
    fn from(address: Address) -> Self {
        Self::token(address)
    }
}

impl fmt::Display for FeeCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(address) => write!(f, "{address}"),
            None => f.write_str("native"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_zero_address_is_native() {
        assert_eq!(FeeCurrency::new(Some(Address::ZERO)), FeeCurrency::NATIVE);
        assert_eq!(FeeCurrency::token(Address::ZERO), FeeCurrency::new(None));
        assert!(FeeCurrency::token(Address::ZERO).is_native());
    }

    #[test]
    fn test_serde_folds_zero_address() {
        let zero = r#""0x0000000000000000000000000000000000000000""#;
        let currency: FeeCurrency = serde_json::from_str(zero).unwrap();
        assert_eq!(currency, FeeCurrency::NATIVE);
        assert!(currency.is_native());
        assert_eq!(serde_json::to_string(&currency).unwrap(), "null");

        let usd = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
        let json = serde_json::to_string(&FeeCurrency::token(usd)).unwrap();
        assert_eq!(serde_json::from_str::<FeeCurrency>(&json).unwrap(), FeeCurrency::token(usd));
    }

    #[test]
    fn test_token_selectors_compare_by_address() {
        let usd = address!("0x765DE816845861e75A25fCA122bb6898B8B1282a");
        assert_eq!(FeeCurrency::token(usd), FeeCurrency::from(Some(usd)));
        assert_ne!(FeeCurrency::token(usd), FeeCurrency::NATIVE);
        assert_eq!(FeeCurrency::token(usd).address(), Some(usd));
    }
}
