//! Solidity interfaces of the contracts the fee currency subsystem calls into.

use alloy_sol_types::sol;

sol! {
    /// The token interface every fee currency implements.
    interface IFeeCurrency {
        /// Balance of `account` in this currency.
        function balanceOf(address account) external view returns (uint256);

        /// Moves `amount` from the caller to `to`.
        function transfer(address to, uint256 amount) external returns (bool);
    }

    /// The registry of currencies allowed for gas payment.
    interface IFeeCurrencyWhitelist {
        /// All whitelisted fee currencies.
        function getWhitelist() external view returns (address[] memory);
    }

    /// The price oracle reporting currency units per native unit.
    interface ISortedOracles {
        /// The median rate of `token`, as `numerator / denominator` token units per native unit.
        function medianRate(address token) external view returns (uint256 numerator, uint256 denominator);
    }

    /// Per-currency configuration of the fee currency directory.
    interface IFeeCurrencyDirectory {
        /// The oracle and intrinsic gas surcharge registered for `token`.
        function getCurrencyConfig(address token) external view returns (address oracle, uint256 intrinsicGas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_token_selectors_match_erc20() {
        assert_eq!(hex::encode(IFeeCurrency::transferCall::SELECTOR), "a9059cbb");
        assert_eq!(hex::encode(IFeeCurrency::balanceOfCall::SELECTOR), "70a08231");
    }
}
