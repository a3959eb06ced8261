pub mod channel;

pub use channel::ChannelNotifier;
