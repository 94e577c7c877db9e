//! Collecting article links from news search and downloading their bodies.

pub mod content;
pub mod links;
pub mod page;

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use rand::Rng;

pub use content::ContentDownloader;
pub use links::LinkScraper;

/// Sleeps for a random duration within `[lo, hi]` seconds.
pub fn pause<R: Rng>(rng: &mut R, [lo, hi]: [f64; 2]) {
    let secs = if hi > lo { rng.gen_range(lo..=hi) } else { lo.max(0.0) };
    if secs > 0.0 {
        thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// Blocks until the operator presses Enter.
pub fn wait_for_operator() {
    println!("\nCAPTCHA TERDETEKSI! Scraping dijeda.");
    print!("Selesaikan verifikasi di browser, lalu tekan ENTER untuk lanjut... ");
    let _ = io::stdout().flush();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        tracing::warn!("could not read from stdin, continuing");
    }
    println!("Melanjutkan scraping...");
}
