//! Console Insights demo - Main Entry Point
//!
//! Mounts the overlay on a window backed by a real HTTP client, drives the
//! demo page through one session while frames tick, then prints the panel.

mod app;

use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use insights_devtools::{
    MemoryInfo, MemorySource, Overlay, OverlayConfig, SystemClock, Window, WindowEvent, http_fetch, panel,
};
use insights_net::HttpFetcher;
use smol::{LocalExecutor, Timer};
use tracing_subscriber::EnvFilter;

use crate::app::DemoApp;

const DEFAULT_URL: &str = "https://jsonplaceholder.typicode.com/todos/1";
const LARGE_IMAGE: &str = "https://source.unsplash.com/random/3840x2160";
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Process memory from `/proc/self/statm`
struct ProcMemory;

impl MemorySource for ProcMemory {
    fn memory_info(&self) -> Option<MemoryInfo> {
        const PAGE_SIZE: u64 = 4096;
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let mut fields = statm.split_whitespace().map(|f| f.parse::<u64>().ok());
        let total = fields.next()??;
        let resident = fields.next()??;
        Some(MemoryInfo {
            used_js_heap_size: resident * PAGE_SIZE,
            total_js_heap_size: total * PAGE_SIZE,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    tracing::info!("Starting Console Insights demo against {}", url);

    let fetcher = HttpFetcher::builder()
        .request_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let window = Window::builder()
        .clock(Rc::new(SystemClock::new()))
        .memory(Rc::new(ProcMemory))
        .fetch(http_fetch(fetcher.clone()))
        .user_agent(&fetcher.config().user_agent)
        .dependency("insights-devtools", env!("CARGO_PKG_VERSION"))
        .dependency("reqwest", "0.12")
        .dependency("smol", "2")
        .build();

    let mut overlay = Overlay::new(OverlayConfig::builder().max_body_bytes(64 * 1024).build());
    overlay.mount(&window)?;

    let ex = LocalExecutor::new();
    smol::block_on(ex.run(async {
        // display refresh
        let frames_window = window.clone();
        let frames = ex.spawn(async move {
            loop {
                Timer::after(FRAME_INTERVAL).await;
                frames_window.run_frame();
            }
        });

        let app = DemoApp::new(window.clone(), Some(fetcher.clone()));
        app.mount();
        for _ in 0..3 {
            app.increment_count();
        }
        window.dispatch_event(&WindowEvent::PointerMove { x: 320.0, y: 240.0 });
        app.fetch_data(&url).await;
        app.trigger_error();
        app.load_large_image(LARGE_IMAGE).await;

        // let at least one sample interval pass
        Timer::after(Duration::from_millis(1100)).await;
        app.unmount();
        drop(frames);
    }));

    let expandable: Vec<usize> = overlay.with_records(|records| {
        records
            .enumerate()
            .filter(|(_, r)| r.details().is_some())
            .map(|(i, _)| i)
            .collect()
    });
    for index in expandable {
        overlay.toggle_expanded(index);
    }

    println!("{}", panel::render_panel(&overlay));
    tracing::info!("captured {} records", overlay.record_count());

    overlay.unmount();
    Ok(())
}
