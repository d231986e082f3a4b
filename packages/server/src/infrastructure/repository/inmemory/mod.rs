mod registry;

pub use registry::InMemoryChatroomRegistry;
