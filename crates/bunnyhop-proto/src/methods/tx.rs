//! `tx` class (id 90): transactional publish/ack batching.
//!
//! Every method in this class is argument-less; `bunnyhop-core` decodes and
//! encodes them but never issues them itself (spec.md scopes transactions
//! out — see `bunnyhop-core`'s channel module for the pass-through).
