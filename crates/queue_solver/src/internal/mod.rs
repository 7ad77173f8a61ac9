pub(crate) mod arena;
pub(crate) mod frozen_copy_map;
pub(crate) mod id;
pub(crate) mod mapping;
