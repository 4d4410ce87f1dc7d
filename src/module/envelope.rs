pub const MAX_NODES: usize = 25;

pub const ENV_ON     : u8 = 0x01;
pub const ENV_LOOP   : u8 = 0x02;
pub const ENV_SUSTAIN: u8 = 0x04;
pub const ENV_FILTER : u8 = 0x80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeNode {
    pub tick : u16,
    pub value: i8,
}

/// Piecewise linear instrument envelope. Node indices are validated at
/// load time, so `lpb <= lpe < nodes.len()` when the loop flag is set.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub flags: u8,
    pub nodes: Vec<EnvelopeNode>,
    pub lpb  : usize,
    pub lpe  : usize,
    pub slb  : usize,
    pub sle  : usize,
}

impl Envelope {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn enabled(&self) -> bool {
        self.flags & ENV_ON != 0 && !self.nodes.is_empty()
    }

    pub fn has_loop(&self) -> bool {
        self.flags & ENV_LOOP != 0
    }

    pub fn has_sustain(&self) -> bool {
        self.flags & ENV_SUSTAIN != 0
    }

    pub fn is_filter(&self) -> bool {
        self.flags & ENV_FILTER != 0
    }

    /// Loop bounds in effect, sustain loop first while the note is held.
    pub fn active_loop(&self, note_off: bool) -> Option<(usize, usize)> {
        if self.has_sustain() && !note_off {
            Some((self.slb, self.sle))
        } else if self.has_loop() {
            Some((self.lpb, self.lpe))
        } else {
            None
        }
    }

    /// Clamp node list and loop points to a consistent state. Ticks must
    /// not decrease along the node list.
    pub fn sanity_check(&mut self) {
        self.nodes.truncate(MAX_NODES);
        if self.nodes.is_empty() {
            self.flags &= !(ENV_ON | ENV_LOOP | ENV_SUSTAIN);
            return
        }

        for i in 1..self.nodes.len() {
            if self.nodes[i].tick < self.nodes[i - 1].tick {
                self.nodes[i].tick = self.nodes[i - 1].tick;
            }
        }

        let last = self.nodes.len() - 1;
        if self.lpb > last || self.lpe > last || self.lpb > self.lpe {
            self.flags &= !ENV_LOOP;
            self.lpb = 0;
            self.lpe = 0;
        }
        if self.slb > last || self.sle > last || self.slb > self.sle {
            self.flags &= !ENV_SUSTAIN;
            self.slb = 0;
            self.sle = 0;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn node(tick: u16, value: i8) -> EnvelopeNode {
        EnvelopeNode { tick, value }
    }

    #[test]
    fn test_sanity_check_invalid_loops() {
        let mut env = Envelope {
            flags: ENV_ON | ENV_LOOP | ENV_SUSTAIN,
            nodes: vec![node(0, 64), node(10, 32), node(5, 0)],
            lpb  : 2,
            lpe  : 1,
            slb  : 0,
            sle  : 7,
        };
        env.sanity_check();
        assert!(env.enabled());
        assert!(!env.has_loop());
        assert!(!env.has_sustain());
        assert_eq!(env.nodes[2].tick, 10);
    }

    #[test]
    fn test_active_loop() {
        let mut env = Envelope {
            flags: ENV_ON | ENV_LOOP | ENV_SUSTAIN,
            nodes: vec![node(0, 64), node(10, 32), node(20, 0)],
            lpb  : 0,
            lpe  : 2,
            slb  : 1,
            sle  : 1,
        };
        env.sanity_check();
        assert_eq!(env.active_loop(false), Some((1, 1)));
        assert_eq!(env.active_loop(true), Some((0, 2)));
    }

    #[test]
    fn test_empty_envelope_is_disabled() {
        let mut env = Envelope { flags: ENV_ON, ..Default::default() };
        env.sanity_check();
        assert!(!env.enabled());
    }
}
