use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shadowloop::{Key, Player, Recorder, Session, SessionCommand, WaveformBuffer};

fn usage() -> ! {
    eprintln!("usage: shadowloop <media-file> [subtitle-file]");
    eprintln!();
    eprintln!("commands on stdin:");
    eprintln!("  space | p     play/pause");
    eprintln!("  left | right  seek -/+5s");
    eprintln!("  up | down     playback rate step");
    eprintln!("  a | b         set loop point at current position");
    eprintln!("  l             toggle A-B loop");
    eprintln!("  c             clear loop points");
    eprintln!("  r             toggle recording");
    eprintln!("  n | v         next / previous sentence");
    eprintln!("  q             quit");
    std::process::exit(2);
}

fn parse_key(word: &str) -> Option<Key> {
    match word {
        "space" | "p" => Some(Key::Space),
        "left" => Some(Key::Left),
        "right" => Some(Key::Right),
        "up" => Some(Key::Up),
        "down" => Some(Key::Down),
        "a" => Some(Key::A),
        "b" => Some(Key::B),
        "l" => Some(Key::L),
        "c" => Some(Key::C),
        "r" => Some(Key::R),
        "f" => Some(Key::F),
        "esc" => Some(Key::Escape),
        _ => None,
    }
}

fn run_commands(
    commands: Vec<SessionCommand>,
    player: &Player,
    recorder: &mut Recorder,
    session: &Arc<Mutex<Session>>,
) {
    for command in commands {
        match command {
            SessionCommand::Playback(cmd) => player.apply(cmd),
            SessionCommand::TogglePlayPause => player.toggle(),
            SessionCommand::SetRate(rate) => {
                player.set_speed(rate);
                println!("rate: {}x", rate);
            }
            SessionCommand::StartRecording => {
                if let Err(e) = recorder.start(Path::new(".")) {
                    if let Ok(mut s) = session.lock() {
                        s.recording_failed(&e.to_string());
                    }
                }
            }
            SessionCommand::StopRecording => {
                let result = recorder.stop(|res| {
                    println!("recording saved: {} ({:.1}s)", res.path, res.duration);
                });
                if let Err(e) = result {
                    log::warn!("stop recording: {}", e);
                }
            }
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(media_path) = args.next().map(PathBuf::from) else { usage() };
    let subtitle_path = args.next().map(PathBuf::from);

    let buffer = match WaveformBuffer::decode_file(&media_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("could not load {}: {}", media_path.display(), e);
            std::process::exit(1);
        }
    };

    let session = Arc::new(Mutex::new(Session::new()));
    {
        let mut s = session.lock().expect("session lock");
        s.load_media(buffer.duration);
        if let Some(path) = &subtitle_path {
            match std::fs::read_to_string(path) {
                Ok(text) => s.load_subtitles(&text),
                Err(e) => eprintln!("could not read {}: {}", path.display(), e),
            }
        }
    }

    let player = Arc::new(Player::new());
    if let Err(e) = player.load(&buffer) {
        eprintln!("audio output unavailable: {}", e);
        std::process::exit(1);
    }

    // Playback clock: poll the player position and let the session decide
    // what playback should do, at roughly 30 Hz.
    {
        let session = session.clone();
        let player = player.clone();
        std::thread::spawn(move || {
            let mut last_cue: Option<usize> = None;
            loop {
                std::thread::sleep(Duration::from_millis(33));
                let position = player.position();
                let Ok(mut s) = session.lock() else { break };
                for cmd in s.on_tick(position) {
                    player.apply(cmd);
                }
                if s.timeline.current_cue != last_cue {
                    last_cue = s.timeline.current_cue;
                    if let Some(cue) = last_cue.and_then(|i| s.cues.get(i)) {
                        println!("[{:.1}s] {}", cue.start, cue.text);
                    }
                }
            }
        });
    }

    println!("loaded {} ({:.1}s). Type commands, 'q' to quit.", media_path.display(), buffer.duration);
    player.play();

    let mut recorder = Recorder::new();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let word = line.trim().to_ascii_lowercase();
        match word.as_str() {
            "" => continue,
            "q" | "quit" => break,
            "n" | "next" => {
                let mut s = session.lock().expect("session lock");
                for cmd in s.next_sentence() {
                    player.apply(cmd);
                }
            }
            "v" | "prev" => {
                let mut s = session.lock().expect("session lock");
                for cmd in s.prev_sentence() {
                    player.apply(cmd);
                }
            }
            _ => match parse_key(&word) {
                Some(key) => {
                    let commands = {
                        let mut s = session.lock().expect("session lock");
                        s.handle_key(key)
                    };
                    run_commands(commands, &player, &mut recorder, &session);
                    if let Ok(s) = session.lock() {
                        if let Some(hint) = s.hint() {
                            println!("{}", hint);
                        }
                    }
                }
                None => println!("unknown command: {}", word),
            },
        }
    }
}
