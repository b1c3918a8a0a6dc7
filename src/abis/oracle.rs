use alloy::sol;

sol! {
    /// Velodrome/Aerodrome Spot Price Aggregator.
    #[sol(rpc)]
    interface ISpotPriceOracle {
        function getManyRatesWithCustomConnectors(
            address[] calldata srcTokens,
            address dstToken,
            bool useWrappers,
            address[] calldata customConnectors,
            uint256 thresholdFilter
        ) external view returns (uint256[] memory rates);
    }
}
