use alloy::sol;

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct McResult {
        bool success;
        bytes returnData;
    }

    /// Multicall3, deployed at the same address on every supported chain.
    #[sol(rpc)]
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (McResult[] memory returnData);
    }

    /// The only ERC20 read batched through multicall: decimals for oracle rate scaling.
    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
    }
}
