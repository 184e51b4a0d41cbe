// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Store-assigned row identity. Immutable once assigned and used as the only
/// key for update and delete.
pub trait RowId: Copy + Debug + Eq + Ord + Hash + Send + Sync + 'static {
    fn raw(self) -> i64;
}

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl RowId for $name {
            fn raw(self) -> i64 {
                self.0
            }
        }
    };
}

entity_id!(CommentId);
entity_id!(StorageItemId);
entity_id!(CarLogId);
