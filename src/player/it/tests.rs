use test_log::test;
use crate::format::it::{ItData, ItPattern, FLAG_INSTRUMENTS};
use crate::module::{event, Event, Instrument, Module, Sample};
use crate::module::instrument::{DuplicateCheckAction, DuplicateCheckType, NewNoteAction, SampleMap};
use crate::module::sample::LoopMode;
use crate::player::{Options, Player};
use crate::MAX_KEYS;
use super::player::{ItPlayer, ECHO_BASE};

fn cell(note: Option<u8>, ins: u8, vol: Option<u8>, cmd: Option<(char, u8)>) -> Event {
    let mut e = Event::new();
    if let Some(n) = note {
        e.mask |= event::HAS_NOTE;
        e.note = n;
    }
    if ins != 0 {
        e.mask |= event::HAS_INS;
        e.ins = ins;
    }
    if let Some(v) = vol {
        e.mask |= event::HAS_VOL;
        e.vol = v;
    }
    if let Some((c, p)) = cmd {
        e.mask |= event::HAS_CMD;
        e.fxt = c as u8 - b'A' + 1;
        e.fxp = p;
    }
    e
}

fn fx(c: char, p: u8) -> Event {
    cell(None, 0, None, Some((c, p)))
}

// Pack (row, channel, cell) triples, always writing a full mask.
fn pack(rows: usize, cells: &[(usize, usize, Event)]) -> ItPattern {
    let mut data = Vec::new();
    for r in 0..rows {
        for &(_, chn, e) in cells.iter().filter(|c| c.0 == r) {
            let mut mask = 0;
            if e.has_note() { mask |= 0x01 }
            if e.has_ins()  { mask |= 0x02 }
            if e.has_vol()  { mask |= 0x04 }
            if e.has_cmd()  { mask |= 0x08 }
            data.push((chn as u8 + 1) | 0x80);
            data.push(mask);
            if e.has_note() { data.push(e.note) }
            if e.has_ins()  { data.push(e.ins) }
            if e.has_vol()  { data.push(e.vol) }
            if e.has_cmd()  { data.extend_from_slice(&[e.fxt, e.fxp]) }
        }
        data.push(0);
    }
    ItPattern::new(rows, data)
}

fn square(len: usize) -> Sample {
    let mut smp = Sample::new();
    smp.name = "square".to_owned();
    smp.loop_mode = LoopMode::Forward;
    smp.loop_start = 0;
    smp.loop_end = len;
    smp.store((0..len).map(|i| if i % 32 < 16 { 8000 } else { -8000 }).collect(), 1);
    smp
}

fn instrument(nna: NewNoteAction) -> Instrument {
    let mut ins = Instrument::new();
    ins.name = "lead".to_owned();
    ins.nna = nna;
    for i in 0..MAX_KEYS {
        ins.keymap.set(i, SampleMap { sample: 1, note: i as u8 });
    }
    ins
}

fn song(channels: usize, speed: u8, pattern: ItPattern) -> ItData {
    let mut data = ItData::new();
    data.channels = channels;
    data.speed = speed;
    data.orders = vec![0];
    data.patterns = vec![pattern];
    data.samples = vec![square(1024)];
    data
}

fn instrument_song(channels: usize, speed: u8, pattern: ItPattern, nna: NewNoteAction) -> ItData {
    let mut data = song(channels, speed, pattern);
    data.flags |= FLAG_INSTRUMENTS;
    data.instruments = vec![instrument(nna)];
    data
}

fn run(p: &mut ItPlayer, data: &ItData, ticks: usize) {
    for _ in 0..ticks {
        assert!(p.advance_tick(data));
    }
}

// Rows played until the end of the song, with speed 1.
fn rows_played(data: &ItData) -> Vec<usize> {
    let mut p = ItPlayer::new(data, Options::default());
    let mut rows = Vec::new();
    while p.advance_tick(data) {
        rows.push(p.row);
        assert!(rows.len() < 100_000, "song doesn't end");
    }
    rows
}

fn live_voices(p: &ItPlayer) -> Vec<usize> {
    (0..p.voices).filter(|&i| p.slaves[i].on).collect()
}


#[test]
fn test_nna_cut_reuses_voice() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(62), 1, None, None)),
    ]);
    let data = instrument_song(1, 6, pat, NewNoteAction::Cut);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(live_voices(&p), vec![0]);
    assert_eq!(p.slaves[0].note, 60);

    run(&mut p, &data, 6);
    assert_eq!(live_voices(&p), vec![0]);
    assert_eq!(p.slaves[0].note, 62);
    assert_eq!(p.hosts[0].slave, Some(0));

    // the old note ramps out in the echo slot
    let echo = &p.slaves[ECHO_BASE];
    assert!(echo.on && echo.echo && echo.voice.ramp_out);
    assert_eq!(echo.note, 60);

    run(&mut p, &data, 1);
    assert!(!p.slaves[ECHO_BASE].on);
}

#[test]
fn test_nna_continue_keeps_old_voice() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(64), 1, None, None)),
    ]);
    let data = instrument_song(1, 6, pat, NewNoteAction::Continue);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 7);
    assert_eq!(live_voices(&p).len(), 2);
    let cur = p.hosts[0].slave.unwrap();
    assert_eq!(p.slaves[cur].note, 64);
    assert!(!p.slaves[cur].disowned);
    let old = 1 - cur;
    assert!(p.slaves[old].disowned);
    assert_eq!(p.slaves[old].note, 60);
}

#[test]
fn test_nna_note_off_fades_without_envelope() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(64), 1, None, None)),
    ]);
    let mut data = instrument_song(1, 6, pat, NewNoteAction::NoteOff);
    data.instruments[0].fadeout = 256;
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 7);
    assert!(p.slaves[0].disowned && p.slaves[0].note_off && p.slaves[0].fading);

    // 1024 / 256 ticks to silence
    run(&mut p, &data, 4);
    assert!(!p.slaves[0].on);
    assert_eq!(live_voices(&p).len(), 1);
}

#[test]
fn test_volume_slide_memory() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, Some(64), Some(('D', 0x04)))),
        (1, 0, fx('D', 0x00)),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 6);
    assert_eq!(p.hosts[0].vol, 44);
    run(&mut p, &data, 6);
    assert_eq!(p.hosts[0].vol, 24);
    assert_eq!(p.slaves[0].vol, 24);
}

#[test]
fn test_fine_volume_slide_applies_once() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, Some(32), Some(('D', 0x3f)))),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 6);
    assert_eq!(p.hosts[0].vol, 35);
}

#[test]
fn test_pattern_loop_plays_three_more_times() {
    let pat = pack(16, &[
        (4, 0, fx('S', 0xb0)),
        (8, 0, fx('S', 0xb3)),
    ]);
    let data = song(1, 1, pat);
    let rows = rows_played(&data);

    assert_eq!(rows.len(), 16 + 3 * 5);
    for r in 0..16 {
        let n = rows.iter().filter(|&&x| x == r).count();
        if r >= 4 && r <= 8 {
            assert_eq!(n, 4, "row {}", r);
        } else {
            assert_eq!(n, 1, "row {}", r);
        }
    }
}

#[test]
fn test_overlapping_loops_terminate() {
    let pat = pack(8, &[
        (0, 0, fx('S', 0xb0)),
        (1, 1, fx('S', 0xb0)),
        (2, 0, fx('S', 0xb1)),
        (3, 1, fx('S', 0xb1)),
    ]);
    let data = song(2, 1, pat);
    assert_eq!(rows_played(&data), vec![0, 1, 2, 0, 1, 2, 3, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_loop_jump_overrides_position_jump() {
    let pat = pack(4, &[
        (0, 0, fx('S', 0xb0)),
        (1, 0, fx('S', 0xb1)),
        (1, 1, fx('S', 0xb0)),
        (2, 1, fx('S', 0xb1)),
        (2, 2, fx('B', 0x00)),
    ]);
    let data = song(3, 1, pat);
    assert_eq!(rows_played(&data), vec![0, 1, 0, 1, 2, 1, 2]);
}

#[test]
fn test_position_jump_ends_after_max_repeat() {
    let pat = pack(4, &[(3, 0, fx('B', 0x00))]);
    let data = song(1, 1, pat);
    assert_eq!(rows_played(&data).len(), 4);

    let options = Options { max_repeat: 2, ..Default::default() };
    let mut p = ItPlayer::new(&data, options);
    let mut n = 0;
    while p.advance_tick(&data) {
        n += 1;
    }
    assert_eq!(n, 8);
}

#[test]
fn test_pattern_break_and_skip_marker() {
    let pat0 = pack(8, &[(1, 0, fx('C', 0x05))]);
    let pat1 = pack(8, &[]);
    let mut data = song(1, 1, pat0);
    data.patterns.push(pat1);
    data.orders = vec![0, 254, 1, 255, 0];
    assert_eq!(rows_played(&data), vec![0, 1, 5, 6, 7]);
}

#[test]
fn test_row_delay() {
    let pat = pack(2, &[(0, 0, fx('S', 0xe2))]);
    let data = song(1, 2, pat);
    // row 0 plays three times, row 1 once
    assert_eq!(rows_played(&data).len(), 3 * 2 + 2);
}

#[test]
fn test_speed_and_tempo() {
    let pat = pack(4, &[
        (0, 0, fx('A', 0x03)),
        (1, 0, fx('T', 0x80)),
        (2, 0, fx('T', 0x12)),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.speed, 3);
    run(&mut p, &data, 3);
    assert_eq!(p.tempo, 0x80);
    // T12 slides up by 2 on each tick after the first
    run(&mut p, &data, 5);
    assert_eq!(p.tempo, 0x80 + 4);
}

#[test]
fn test_note_delay_and_cut() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, Some(('S', 0xd3)))),
        (1, 0, cell(Some(60), 1, None, Some(('S', 0xc2)))),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.live_slave(0), None);
    run(&mut p, &data, 3);
    assert!(p.live_slave(0).is_some());

    run(&mut p, &data, 4);
    assert!(p.live_slave(0).is_some());
    run(&mut p, &data, 1);
    assert_eq!(p.live_slave(0), None);
}

#[test]
fn test_sample_offset() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, Some(('O', 0x02)))),
        (1, 0, cell(Some(60), 1, None, Some(('O', 0x08)))),
    ]);
    let data = song(1, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].voice.position(), 0x200);
    // past the end of the sample plays from the start
    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].voice.position(), 0);
}

#[test]
fn test_tone_portamento_reaches_target() {
    let pat = pack(8, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(72), 0, None, Some(('G', 0x40)))),
        (2, 0, fx('G', 0x00)),
        (3, 0, fx('G', 0x00)),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 7);
    // the note sets the target without retriggering
    assert_eq!(p.slaves[0].note, 72);
    assert_eq!(p.slaves[0].freq, 8363);
    run(&mut p, &data, 17);
    assert_eq!(p.slaves[0].freq, 16726);
}

#[test]
fn test_midi_macro_sets_cutoff() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, None, Some(('Z', 0x40)))),
        (1, 0, fx('Z', 0x82)),
    ]);
    let data = song(1, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.hosts[0].cutoff, 0x40);
    assert_eq!(p.slaves[0].cutoff, 0x40);
    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].resonance, 0x10);
}

#[test]
fn test_set_pan_and_surround() {
    let pat = pack(3, &[
        (0, 0, cell(Some(60), 1, None, Some(('X', 0xff)))),
        (1, 0, fx('S', 0x91)),
        (2, 0, fx('S', 0x80)),
    ]);
    let data = song(1, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].final_pan, 64);
    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].final_pan, 100);
    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].final_pan, 0);
}

#[test]
fn test_allocator_links_voice_to_host() {
    let pat = pack(1, &[]);
    let data = instrument_song(4, 6, pat, NewNoteAction::Continue);
    let options = Options { voices: 8, ..Default::default() };
    let mut p = ItPlayer::new(&data, options);

    for n in 0..200 {
        let h = n % 4;
        if let Some(s) = p.alloc(&data, h, Some(0), 0, (n % 100) as u8) {
            p.slaves[s].nna = NewNoteAction::Continue;
            assert!(s < 8);
            assert!(!p.slaves[s].disowned);
            assert_eq!(p.slaves[s].host, h);
            assert_eq!(p.hosts[h].slave, Some(s));
        }
        assert!(live_voices(&p).len() <= 8);
        for (i, host) in p.hosts.iter().enumerate() {
            if let Some(s) = host.slave {
                assert!(!p.slaves[s].on || p.slaves[s].host == i);
            }
        }
    }
}

#[test]
fn test_voice_stealing_prefers_background_voices() {
    let mut cells = vec![];
    for r in 0..12 {
        cells.push((r, 0, cell(Some(40 + r as u8), 1, None, None)));
    }
    let data = instrument_song(1, 1, pack(12, &cells), NewNoteAction::Continue);
    let options = Options { voices: 4, ..Default::default() };
    let mut p = ItPlayer::new(&data, options);

    run(&mut p, &data, 12);
    assert_eq!(live_voices(&p).len(), 4);
    let cur = p.hosts[0].slave.unwrap();
    assert_eq!(p.slaves[cur].note, 51);
}

#[test]
fn test_sample_mode_owns_one_voice_per_channel() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (0, 1, cell(Some(67), 1, None, None)),
        (1, 1, cell(Some(72), 1, None, None)),
    ]);
    let data = song(2, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 2);
    assert_eq!(p.hosts[0].slave, Some(0));
    assert_eq!(p.hosts[1].slave, Some(1));
    assert_eq!(p.slaves[1].note, 72);
}

#[test]
fn test_note_off_in_sample_mode_cuts() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(255), 0, None, None)),
    ]);
    let data = song(1, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 2);
    assert_eq!(p.live_slave(0), None);
}

fn module(data: ItData) -> Module {
    Module {
        format_id  : "it",
        description: "test".to_owned(),
        creator    : "test".to_owned(),
        player     : "it",
        data       : Box::new(data),
    }
}

#[test]
fn test_scan_length() {
    let module = module(song(1, 6, pack(64, &[(0, 0, cell(Some(60), 1, None, None))])));
    let player = Player::find(&module, "it", Options::default()).unwrap();
    let scan = player.scan(&module);
    assert_eq!(scan.ticks, 64 * 6);
    assert_eq!(scan.time, 64 * 6 * 20);
    assert_eq!(scan.row, 63);
}

#[test]
fn test_render_and_status() {
    let module = module(song(1, 6, pack(4, &[(0, 0, cell(Some(60), 1, None, None))])));
    let mut player = Player::find(&module, "it", Options::default()).unwrap();

    let mut buf = vec![0_i16; 4096];
    let frames = player.build_tick(&module, Some(&mut buf));
    assert_eq!(frames, 882);
    assert!(buf[..frames * 2].iter().any(|&x| x != 0));

    let status = player.channel_status(&module, 0).unwrap();
    assert!(status.active);
    assert_eq!(status.note, 60);
    assert_eq!(status.instrument, 1);
    assert_eq!(status.instrument_name, "square");
    assert_eq!(status.volume, 64);
    assert_eq!(status.cell_text, "C-5 01 ... ...");
    assert!(player.channel_status(&module, 1).is_none());
    assert_eq!(player.channel_count(), 1);

    // the song ends after 4 rows
    let mut n = 1;
    while player.build_tick(&module, None) > 0 {
        n += 1;
    }
    assert_eq!(n, 4 * 6);
}

#[test]
fn test_fill_buffer_loops() {
    let module = module(song(1, 6, pack(1, &[(0, 0, cell(Some(60), 1, None, None))])));
    let mut player = Player::find(&module, "it", Options::default()).unwrap();

    // one pass is 6 ticks of 882 frames
    let mut buf = vec![0_i16; 882 * 2 * 10];
    player.fill_buffer(&module, &mut buf, 1);
    assert!(buf[882 * 2 * 7..882 * 2 * 8].iter().any(|&x| x != 0));
    assert!(buf[882 * 2 * 9..].iter().any(|&x| x != 0));
}

#[test]
fn test_note_without_instrument_keeps_volume() {
    let pat = pack(3, &[
        (0, 0, cell(Some(60), 1, Some(20), None)),
        (1, 0, cell(Some(62), 0, None, None)),
        (2, 0, cell(Some(64), 1, None, None)),
    ]);
    let data = song(1, 1, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 1);
    assert_eq!(p.hosts[0].vol, 20);
    run(&mut p, &data, 1);
    assert_eq!(p.slaves[0].note, 62);
    assert_eq!(p.hosts[0].vol, 20);
    assert_eq!(p.slaves[0].vol, 20);

    // the instrument number brings back the sample volume
    run(&mut p, &data, 1);
    assert_eq!(p.hosts[0].vol, 64);
}

#[test]
fn test_retrig_after_note_off_leaves_sustain_loop() {
    let pat = pack(3, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(255), 0, None, None)),
        (2, 0, fx('Q', 0x01)),
    ]);
    let mut data = song(1, 2, pat);
    {
        let smp = &mut data.samples[0];
        smp.sloop_mode = LoopMode::Forward;
        smp.sloop_start = 256;
        smp.sloop_end = 512;
    }
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 3);
    assert_eq!(p.live_slave(0), Some(0));
    assert!(p.slaves[0].voice.released);

    run(&mut p, &data, 3);
    assert_eq!(p.live_slave(0), Some(0));
    assert_eq!(p.slaves[0].voice.position(), 0);
    assert!(p.slaves[ECHO_BASE].on);
    let voice = &p.slaves[0].voice;
    assert!(voice.released);
    assert_eq!(data.samples[0].active_loop(voice.released), (LoopMode::Forward, 0, 1024));
}

#[test]
fn test_duplicate_note_is_cut() {
    let pat = pack(3, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(60), 1, None, None)),
        (2, 0, cell(Some(62), 1, None, None)),
    ]);
    let mut data = instrument_song(1, 1, pat, NewNoteAction::Continue);
    data.instruments[0].dct = DuplicateCheckType::Note;
    data.instruments[0].dca = DuplicateCheckAction::Cut;
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 2);
    assert_eq!(live_voices(&p), vec![0]);
    assert!(!p.slaves[0].disowned);
    let echo = &p.slaves[ECHO_BASE];
    assert!(echo.on && echo.echo);
    assert_eq!(echo.note, 60);

    // a different note is not a duplicate
    run(&mut p, &data, 1);
    assert_eq!(live_voices(&p), vec![0, 1]);
    assert!(p.slaves[0].disowned);
    assert_eq!(p.hosts[0].slave, Some(1));
}

#[test]
fn test_duplicate_note_off_releases() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(60), 1, None, None)),
    ]);
    let mut data = instrument_song(1, 1, pat, NewNoteAction::Continue);
    data.instruments[0].dct = DuplicateCheckType::Note;
    data.instruments[0].dca = DuplicateCheckAction::NoteOff;
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 2);
    assert_eq!(live_voices(&p), vec![0, 1]);
    assert!(p.slaves[0].disowned && p.slaves[0].note_off);
    assert!(!p.slaves[1].note_off);
}

#[test]
fn test_note_with_volume_column_porta_skips_command() {
    let pat = pack(4, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(72), 0, Some(194), Some(('A', 0x03)))),
        (2, 0, cell(Some(60), 0, Some(205), Some(('A', 0x03)))),
        (3, 0, cell(None, 0, Some(194), Some(('A', 0x03)))),
    ]);
    let data = song(1, 6, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 7);
    assert_eq!(p.speed, 6);
    assert_eq!(p.hosts[0].cmd, None);
    assert!(p.hosts[0].porta_on);
    assert_eq!(p.slaves[0].note, 72);

    // vibrato in the volume column
    run(&mut p, &data, 6);
    assert_eq!(p.speed, 6);
    assert_eq!(p.hosts[0].cmd, None);

    // without a note the command runs
    run(&mut p, &data, 6);
    assert_eq!(p.speed, 3);
}

#[test]
fn test_row_repeat_limit_ends_song() {
    // 16 outer passes of 16 inner passes enter row 0 256 times
    let pat = pack(4, &[
        (0, 0, fx('S', 0xb0)),
        (1, 0, fx('S', 0xbf)),
        (2, 1, fx('S', 0xbf)),
    ]);
    let data = song(2, 1, pat);
    let rows = rows_played(&data);

    assert_eq!(rows.iter().filter(|&&r| r == 0).count(), 255);
    assert_eq!(rows.iter().filter(|&&r| r == 2).count(), 15);
    assert!(!rows.contains(&3));
    assert_eq!(rows.len(), 15 * 33 + 30);
}

#[test]
fn test_long_row_fires_delay_once() {
    let pat = pack(2, &[
        (0, 0, cell(Some(60), 1, None, Some(('S', 0xd3)))),
        (0, 1, fx('S', 0x6f)),
    ]);
    let data = song(2, 255, pat);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 4);
    assert_eq!(p.live_slave(0), Some(0));

    // frame 259 wraps to 3 in 8 bits
    run(&mut p, &data, 256);
    assert_eq!(p.frame, 259);
    assert!(!p.slaves[ECHO_BASE].on);
    assert_eq!(p.live_slave(0), Some(0));

    run(&mut p, &data, 10);
    assert_eq!(p.row, 0);
    run(&mut p, &data, 1);
    assert_eq!(p.row, 1);
}

#[test]
fn test_cuts_on_one_tick_all_ramp_out() {
    let pat = pack(3, &[
        (0, 0, cell(Some(60), 1, None, None)),
        (1, 0, cell(Some(62), 1, None, None)),
    ]);
    let data = instrument_song(1, 1, pat, NewNoteAction::Continue);
    let mut p = ItPlayer::new(&data, Options::default());

    run(&mut p, &data, 2);
    assert_eq!(live_voices(&p), vec![0, 1]);
    p.echo(0, 0);
    p.echo(0, 1);
    assert!(live_voices(&p).is_empty());
    assert_eq!(p.hosts[0].slave, None);

    let mut notes: Vec<u8> = p.slaves[ECHO_BASE..].iter()
        .filter(|s| s.on && s.echo)
        .map(|s| s.note)
        .collect();
    notes.sort();
    assert_eq!(notes, vec![60, 62]);

    run(&mut p, &data, 1);
    assert!(p.slaves.iter().all(|s| !s.on));
}
