/// A 32-byte hash, used here for signing roots. Re-exported from `ethereum-types` rather than
/// redefined, as the rest of the Lighthouse stack does.
pub use ethereum_types::H256 as Hash256;
