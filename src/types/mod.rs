//! Wire and domain types shared by the gateway, the Drive client and the handlers.

pub mod drive;
