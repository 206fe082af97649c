//! Contract interfaces used by the markets

use alloy_sol_types::sol;

sol! {
    interface IUniswapV2Pair {
        function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes data) external;
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface UniswapFlashQuery {
        function getReservesByPairs(address[] pairs) external view returns (uint256[3][]);
        function getPairsByIndexRange(address factory, uint256 start, uint256 stop) external view returns (address[3][]);
    }

    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }
}
