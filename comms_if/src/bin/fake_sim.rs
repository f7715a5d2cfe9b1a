//! Fake simulator
//!
//! Sends a synthetic telemetry stream to the drive executable and prints the demands it gets
//! back. Useful for checking the network link without running the real simulator.

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    sim::{self, Telemetry},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "fake_sim", about = "Send synthetic telemetry to the drive executable")]
struct Opt {
    /// Endpoint of the drive executable
    #[structopt(short, long, default_value = "tcp://localhost:4567")]
    endpoint: String,

    /// Peak cross track error of the synthetic signal
    #[structopt(short, long, default_value = "1.5")]
    amplitude: f64,

    /// Period of the synthetic signal in samples
    #[structopt(short, long, default_value = "200")]
    wavelength: u32,

    /// Reported vehicle speed
    #[structopt(short, long, default_value = "30.0")]
    speed: f64,

    /// Milliseconds between samples
    #[structopt(long, default_value = "50")]
    period_ms: u64,

    /// Number of samples to send, runs forever if not given
    #[structopt(short, long)]
    count: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        connect_timeout: 1000,
        heartbeat_ivl: 500,
        heartbeat_ttl: 1000,
        heartbeat_timeout: 1000,
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 10,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    let socket = match MonitoredSocket::new(&ctx, zmq::REQ, socket_options, &opt.endpoint) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the drive executable at {}", opt.endpoint);
            return Err(e.into());
        }
    };

    println!("Connected to {}", opt.endpoint);

    let mut sample: u64 = 0;

    while opt.count.map_or(true, |c| sample < c) {
        // Don't build up a backlog of requests while the server is away
        if !socket.connected() {
            println!("Waiting for connection");
            std::thread::sleep(std::time::Duration::from_millis(1000));
            continue;
        }

        let phase = std::f64::consts::TAU * (sample as f64) / (opt.wavelength.max(1) as f64);
        let telem = Telemetry {
            cte: opt.amplitude * phase.sin(),
            speed: opt.speed,
            steering_angle: None,
        };

        if let Err(e) = socket.send(sim::telemetry_message(&telem).as_str(), 0) {
            println!("could not send: {}", e);
            std::thread::sleep(std::time::Duration::from_millis(1000));
            continue;
        }

        match socket.recv_string(0) {
            Ok(Ok(reply)) => match sim::parse_reply(&reply) {
                Some(dems) => println!(
                    "[{:6}] cte: {:+.4} -> steering: {:+.4}, throttle: {:+.4}",
                    sample, telem.cte, dems.steering, dems.throttle
                ),
                None => println!("[{:6}] cte: {:+.4} -> {}", sample, telem.cte, reply),
            },
            Ok(Err(_)) => println!("Non UTF-8 reply"),
            Err(e) => println!("could not read from server: {}", e),
        }

        sample += 1;
        std::thread::sleep(std::time::Duration::from_millis(opt.period_ms));
    }

    Ok(())
}
