use std::cmp::Reverse;
use std::collections::HashMap;
use crate::format::it::ItData;
use crate::module::instrument::{DuplicateCheckAction, DuplicateCheckType, NewNoteAction};
use crate::module::sample::LoopMode;
use super::player::{ItPlayer, ECHO_BASE, MAX_SLAVES};
use super::slave::Slave;

impl ItPlayer {
    /// Copy a voice to the host's echo slot, where it ramps out during
    /// the next mix. A second cut on the same tick takes an unused slot
    /// outside the voice range.
    pub(super) fn ramp_copy(&mut self, h: usize, s: usize) {
        if !self.slaves[s].on || self.slaves[s].voice.ended {
            return
        }
        let mut slot = ECHO_BASE + h;
        if self.slaves[slot].on {
            let spare = (ECHO_BASE + self.channels..MAX_SLAVES)
                .chain(self.voices..ECHO_BASE)
                .find(|&i| !self.slaves[i].on);
            match spare {
                Some(i) => slot = i,
                None    => trace!("no spare echo slot for host {}", h),
            }
        }

        let mut echo = self.slaves[s].clone();
        echo.echo = true;
        echo.disowned = true;
        echo.voice.ramp_out = true;
        self.slaves[slot] = echo;
    }

    /// Cut a voice with a short ramp.
    pub(super) fn echo(&mut self, h: usize, s: usize) {
        self.ramp_copy(h, s);
        self.slaves[s].on = false;
        if self.hosts[h].slave == Some(s) {
            self.hosts[h].slave = None;
        }
    }

    /// Key release: sustain loops end, and the note fades or stops
    /// depending on what can release it.
    pub(super) fn note_off_slave(&mut self, module: &ItData, s: usize) {
        let slave = &mut self.slaves[s];
        slave.release();

        if self.instrument_mode {
            let env = slave.ins.and_then(|i| module.instruments.get(i)).map(|x| &x.vol_env);
            match env {
                Some(env) if slave.vol_env_on && !env.has_loop() => (),
                _ => slave.start_fade(),
            }
        } else {
            let sustain = module.samples.get(slave.smp).map(|x| x.sloop_mode != LoopMode::None).unwrap_or(false);
            if !sustain {
                let h = slave.host;
                self.echo(h, s);
            }
        }
    }

    // Apply the new note action of the host's current voice. Returns the
    // slot to reuse when the voice was cut.
    fn new_note_action(&mut self, module: &ItData, h: usize) -> Option<usize> {
        let cur = self.live_slave(h)?;
        self.hosts[h].slave = None;

        match self.slaves[cur].nna {
            NewNoteAction::Cut => {
                self.echo(h, cur);
                return Some(cur)
            }
            NewNoteAction::Continue => (),
            NewNoteAction::NoteOff => self.note_off_slave(module, cur),
            NewNoteAction::Fade => self.slaves[cur].start_fade(),
        }
        self.slaves[cur].disowned = true;
        None
    }

    // Duplicate check against the voices this host left playing.
    fn duplicate_check(&mut self, module: &ItData, h: usize, ins: usize, smp: usize, note: u8) -> Option<usize> {
        let instrument = module.instruments.get(ins)?;
        if instrument.dct == DuplicateCheckType::Off {
            return None
        }

        let mut reuse = None;
        for i in 0..self.voices {
            let s = &self.slaves[i];
            if !s.on || !s.disowned || s.host != h || s.ins != Some(ins) {
                continue
            }
            let dup = match instrument.dct {
                DuplicateCheckType::Note       => s.pattern_note == note,
                DuplicateCheckType::Sample     => s.smp == smp,
                DuplicateCheckType::Instrument => true,
                DuplicateCheckType::Off        => false,
            };
            if !dup {
                continue
            }

            trace!("duplicate voice {} on host {}, {:?}", i, h, instrument.dca);
            match instrument.dca {
                DuplicateCheckAction::Cut => {
                    self.echo(h, i);
                    if reuse.is_none() {
                        reuse = Some(i);
                    }
                }
                DuplicateCheckAction::NoteOff => self.note_off_slave(module, i),
                DuplicateCheckAction::Fade    => self.slaves[i].start_fade(),
            }
        }
        reuse
    }

    fn free_slot(&self) -> Option<usize> {
        (0..self.voices).find(|&i| !self.slaves[i].on)
    }

    // Steal from the sample with most voices, when it has more than two.
    fn steal_duplicated_sample(&self) -> Option<usize> {
        let mut count = HashMap::new();
        for s in self.slaves[..self.voices].iter().filter(|s| s.on) {
            *count.entry(s.smp).or_insert(0_usize) += 1;
        }
        let (&smp, &n) = count.iter().max_by_key(|&(&smp, &n)| (n, Reverse(smp)))?;
        if n <= 2 {
            return None
        }

        (0..self.voices)
            .filter(|&i| self.slaves[i].on && self.slaves[i].smp == smp)
            .min_by_key(|&i| (!self.slaves[i].disowned, self.slaves[i].final_vol))
    }

    // The quietest background voice.
    fn steal_disowned(&self) -> Option<usize> {
        (0..self.voices)
            .filter(|&i| self.slaves[i].on && self.slaves[i].disowned)
            .min_by_key(|&i| self.slaves[i].final_vol)
    }

    // A voice of the busiest host playing a sample that host plays twice.
    fn steal_from_busiest_host(&self) -> Option<usize> {
        let mut count = vec![0_usize; self.hosts.len()];
        for s in self.slaves[..self.voices].iter().filter(|s| s.on) {
            count[s.host] += 1;
        }
        let busiest = (0..count.len()).max_by_key(|&h| (count[h], Reverse(h)))?;
        if count[busiest] == 0 {
            return None
        }

        let on_host: Vec<usize> = (0..self.voices)
            .filter(|&i| self.slaves[i].on && self.slaves[i].host == busiest)
            .collect();
        on_host.iter().copied().find(|&i| {
            on_host.iter().any(|&j| j != i && self.slaves[j].smp == self.slaves[i].smp)
        })
    }

    /// Find a voice for a new note on host `h` and link it to the host.
    /// Returns `None` when every voice is busy and none can be stolen.
    pub(super) fn alloc(&mut self, module: &ItData, h: usize, ins: Option<usize>, smp: usize, note: u8) -> Option<usize> {
        let slot = if !self.instrument_mode {
            if self.slaves[h].on {
                self.echo(h, h);
            }
            h
        } else {
            let cut = self.new_note_action(module, h);
            let dup = match ins {
                Some(ins) => self.duplicate_check(module, h, ins, smp, note),
                None      => None,
            };

            let slot = cut.or(dup)
                .or_else(|| self.free_slot())
                .or_else(|| self.steal_duplicated_sample())
                .or_else(|| self.steal_disowned())
                .or_else(|| self.steal_from_busiest_host());

            match slot {
                Some(s) => {
                    if self.slaves[s].on {
                        debug!("voice {} stolen from host {}", s, self.slaves[s].host);
                        let owner = self.slaves[s].host;
                        self.echo(owner, s);
                    }
                    s
                }
                None => {
                    debug!("no voice for host {}", h);
                    return None
                }
            }
        };

        let s = &mut self.slaves[slot];
        *s = Slave::new();
        s.on = true;
        s.host = h;
        s.disowned = false;
        self.hosts[h].slave = Some(slot);
        Some(slot)
    }
}
