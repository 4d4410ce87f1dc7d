extern crate oxit;
extern crate getopts;

use std::env;
use std::error::Error;
use std::fs;
use getopts::{Matches, Options};
use oxit::{format, module, player, FrameInfo};
use oxit::mixer::interpolator::Interpolator;

fn main() {

    let args: Vec<String> = env::args().collect();
    let mut opts = Options::new();

    opts.optflag("h", "help", "display usage information and exit");
    opts.optopt("r", "rate", "sampling rate in Hz (default 44100)", "RATE");
    opts.optopt("i", "interpolation", "nearest, linear or spline", "INTERP");
    opts.optopt("t", "time", "maximum replay time in seconds", "SECS");
    opts.optopt("o", "output", "render to a WAV file", "FILE");
    opts.optopt("p", "pattern", "show the pattern and exit", "PAT");
    opts.optopt("n", "voices", "number of mixer voices (default 192)", "NUM");
    opts.optflag("l", "length", "show the replay length and exit");
    opts.optflagmulti("v", "verbose", "increase logging level");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    if matches.opt_present("h") || matches.free.is_empty() {
        let brief = format!("Usage: {} [options] filename", args[0]);
        print!("{}", opts.usage(&brief));
        return;
    }

    let level = match matches.opt_count("v") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_opt<T: std::str::FromStr>(matches: &Matches, name: &str, default: T) -> Result<T, Box<dyn Error>> {
    match matches.opt_str(name) {
        Some(s) => s.parse().map_err(|_| format!("invalid value for -{}: {}", name, s).into()),
        None    => Ok(default),
    }
}

fn run(matches: &Matches) -> Result<(), Box<dyn Error>> {
    let name = &matches.free[0];
    let b = fs::read(name)?;

    let mut options = player::Options::default();
    options.rate = parse_opt(matches, "r", options.rate)?;
    options.voices = parse_opt(matches, "n", options.voices)?;
    if let Some(s) = matches.opt_str("i") {
        options.interpolation = Interpolator::from_name(&s)
            .ok_or_else(|| format!("unknown interpolation {}", s))?;
    }
    let max_time: f64 = parse_opt(matches, "t", 600.0)?;

    let module = format::load(&b, "")?;
    show_info(&module, &b);

    if let Some(s) = matches.opt_str("p") {
        let num = s.parse().map_err(|_| format!("invalid pattern {}", s))?;
        show_pattern(&module, num);
        return Ok(())
    }

    let mut player = player::Player::find(&module, module.player, options)?;
    let scan = player.scan(&module);
    println!("Length     : {}:{:02} ({} ticks)", scan.time / 60000, scan.time / 1000 % 60, scan.ticks);
    if matches.opt_present("l") {
        return Ok(())
    }

    let path = match matches.opt_str("o") {
        Some(path) => path,
        None       => return Ok(()),
    };

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: options.rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;

    let mut frame_info = FrameInfo::new();
    let mut buffer = vec![0_i16; oxit::MAX_FRAMESIZE * 2];
    loop {
        let frames = player.build_tick(&module, Some(&mut buffer[..]));
        if frames == 0 {
            break
        }
        for &x in &buffer[..frames * 2] {
            writer.write_sample(x)?;
        }

        player.info(&mut frame_info);
        if frame_info.frame == 0 {
            print!("pos:{:3} row:{:3} speed:{:2} tempo:{:3} time:{:7.1}s\r",
                frame_info.pos, frame_info.row, frame_info.speed, frame_info.tempo, frame_info.time / 1000.0);
        }
        if frame_info.time / 1000.0 >= max_time {
            break
        }
    }
    println!();
    writer.finalize()?;

    Ok(())
}

fn show_info(module: &module::Module, b: &[u8]) {
    let data = &module.data;
    println!("Title      : {}", module.title());
    println!("Type       : {} ({})", module.description, module.creator);
    println!("MD5        : {:x}", md5::compute(b));
    println!("Channels   : {}", module.channels());
    println!("Positions  : {} ({} patterns)", data.len(), data.patterns());

    println!("Instruments:");
    for (i, name) in data.instruments().iter().enumerate() {
        println!("{:3}: {}", i + 1, name);
    }

    println!("Samples:");
    for smp in data.samples() {
        println!("{:3}: {:26} {:7} {:7} {:7} {:5}", smp.num, smp.name, smp.size, smp.loop_start, smp.loop_end, smp.rate);
    }
}

fn show_pattern(module: &module::Module, num: usize) {
    let data = &module.data;
    println!("Pattern {}:", num);
    for r in 0..data.rows(num) {
        print!("{:3}: ", r);
        for c in 0..data.channels() {
            print!("{}  ", data.event(num, r, c))
        }
        println!();
    }
}
