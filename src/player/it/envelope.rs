use crate::module::Envelope;

/// Playback position inside an instrument envelope. `node` is the node
/// being approached, `value` is 16.16 fixed point.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCursor {
    pub tick    : i32,
    pub node    : usize,
    pub value   : i32,
    pub slope   : i32,
    pub holding : bool,
    pub finished: bool,
}

impl EnvelopeCursor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Place the cursor on the first node.
    pub fn start(&mut self, env: &Envelope, note_off: bool) {
        *self = EnvelopeCursor::new();
        if env.nodes.is_empty() {
            self.finished = true;
            return
        }
        self.tick = env.nodes[0].tick as i32;
        self.arrive(env, note_off);
    }

    pub fn value(&self) -> i32 {
        self.value >> 16
    }

    // Snap to the current node and pick the next segment.
    fn arrive(&mut self, env: &Envelope, note_off: bool) {
        let nodes = &env.nodes;
        self.value = (nodes[self.node].value as i32) << 16;
        self.slope = 0;
        self.holding = false;

        if let Some((lb, le)) = env.active_loop(note_off) {
            if self.node >= le {
                if lb == le {
                    self.holding = true;
                    return
                }
                self.node = lb;
                self.tick = nodes[lb].tick as i32;
                self.value = (nodes[lb].value as i32) << 16;
            }
        }

        let next = self.node + 1;
        if next >= nodes.len() {
            self.finished = true;
            return
        }

        let dt = (nodes[next].tick as i32 - nodes[self.node].tick as i32).max(1);
        let dv = (nodes[next].value as i32 - nodes[self.node].value as i32) << 16;
        self.slope = dv / dt;
        self.node = next;
    }

    /// Advance one tick. Returns false once the envelope has ended.
    pub fn advance(&mut self, env: &Envelope, note_off: bool) -> bool {
        if self.finished || env.nodes.is_empty() {
            return false
        }

        if self.holding {
            match env.active_loop(note_off) {
                Some((lb, le)) if lb == le && self.node >= le => return true,
                _ => {
                    // sustain released, continue from here
                    self.arrive(env, note_off);
                    return !self.finished
                }
            }
        }

        self.tick += 1;
        self.value += self.slope;
        if self.tick >= env.nodes[self.node].tick as i32 {
            self.arrive(env, note_off);
        }

        !self.finished
    }
}
