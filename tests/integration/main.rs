//! Integration tests: the swap engine driven end to end through its
//! public API against in-memory collaborators.

mod mock_chain;
mod scenarios;
