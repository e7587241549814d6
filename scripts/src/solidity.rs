//! Definitions of Solidity functions called during deployment

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use alloy::sol;

sol! {
    /// The network factory, as seen through its proxy
    interface INetworkFactory {
        function init(
            address factoryAdmin,
            address ethDepositAddress,
            address feePoolLogicAddress,
            address networkBalancesLogicAddress,
            address networkProposalLogicAddress,
            address nodeDepositLogicAddress,
            address userDepositLogicAddress,
            address networkWithdrawalLogicAddress
        ) external;

        function factoryAdmin() external view returns (address);
        function ethDepositAddress() external view returns (address);
        function feePoolLogicAddress() external view returns (address);
        function networkBalancesLogicAddress() external view returns (address);
        function networkProposalLogicAddress() external view returns (address);
        function nodeDepositLogicAddress() external view returns (address);
        function userDepositLogicAddress() external view returns (address);
        function networkWithdrawalLogicAddress() external view returns (address);
    }

    /// Raised by OpenZeppelin's `Initializable` (v5) on a second initialization
    error InvalidInitialization();

    /// Raised by hand-rolled initializer guards on a second initialization
    error AlreadyInitialized();
}
