//! Definitions of Solidity functions called during deployment

use alloy_sol_types::sol;

sol! {
    /// The admin-upgradeable proxy's one-shot setup
    interface IInitializableAdminUpgradeabilityProxy {
        function initialize(address logic, address admin, bytes data) external payable;
    }

    /// The governance core entry points used to hand ownership to the executor
    interface IGovernanceCore {
        function authorizeExecutors(address[] executors) external;
        function transferOwnership(address newOwner) external;
        function isExecutorAuthorized(address executor) external view returns (bool);
        function owner() external view returns (address);
    }
}
