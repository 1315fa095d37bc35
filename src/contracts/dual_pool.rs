use ethers::prelude::abigen;

// Solidly-family factory (Velodrome v2, Aerodrome): one stable and one volatile pool per pair.
abigen!(
    ISolidlyFactory,
    r#"[
        function getPair(address tokenA, address tokenB, bool stable) external view returns (address)
        function getFee(address pool, bool stable) external view returns (uint256)
    ]"#
);

abigen!(
    ISolidlyPair,
    r#"[
        function metadata() external view returns (uint256 dec0, uint256 dec1, uint256 r0, uint256 r1, bool st, address t0, address t1)
    ]"#
);
