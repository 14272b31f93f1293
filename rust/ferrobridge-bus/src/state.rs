use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Created,
    Running,
    Stopping,
    Stopped,
}

fn to_u8(s: BusState) -> u8 {
    match s {
        BusState::Created => 0,
        BusState::Running => 1,
        BusState::Stopping => 2,
        BusState::Stopped => 3,
    }
}

fn from_u8(v: u8) -> BusState {
    match v {
        0 => BusState::Created,
        1 => BusState::Running,
        2 => BusState::Stopping,
        _ => BusState::Stopped,
    }
}

pub struct AtomicBusState(AtomicU8);

impl AtomicBusState {
    pub fn new(initial: BusState) -> Self {
        Self(AtomicU8::new(to_u8(initial)))
    }

    pub fn get(&self) -> BusState {
        from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: BusState) {
        self.0.store(to_u8(state), Ordering::Release);
    }
}
