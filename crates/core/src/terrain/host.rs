use crate::{
    geo::Coordinates,
    terrain::{Biome, TerrainOracle, TerrainSample},
    Meter,
};
use anyhow::anyhow;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender,
};
use log::trace;
use std::time::{Duration, Instant};

type Reply = anyhow::Result<Vec<TerrainSample>>;

/// One batch of points to sample, plus the channel to send the answer back
/// on
struct Request {
    points: Vec<Coordinates>,
    reply: Sender<Reply>,
}

/// The host side of a terrain oracle that may only be called from one
/// context (e.g. an engine's main thread). The host owns the real oracle
/// and answers requests from [OracleProxy]s whenever it's pumped. Nothing
/// else ever touches the oracle.
pub struct OracleHost<O> {
    oracle: O,
    requests: Receiver<Request>,
}

/// The worker side of a host-bound oracle. Each [TerrainOracle::sample]
/// call is a synchronous round trip: the request is queued for the host,
/// and the caller blocks until the host answers or the timeout expires.
/// Proxies are cheap to clone and can be moved to any thread.
#[derive(Clone, Debug)]
pub struct OracleProxy {
    requests: Sender<Request>,
    biomes: Vec<Biome>,
    radius: Meter,
    timeout: Duration,
}

impl<O: TerrainOracle> OracleHost<O> {
    /// Max number of requests waiting for the host at once
    const QUEUE_SIZE: usize = 16;

    /// Wrap an oracle, returning the host half (which stays in the host
    /// context) and a proxy (which goes to the worker). `timeout` bounds each
    /// leg of a round trip, so a host that stops pumping fails the worker's
    /// call instead of hanging it.
    pub fn new(oracle: O, timeout: Duration) -> (Self, OracleProxy) {
        let (sender, receiver) = bounded(Self::QUEUE_SIZE);
        // The biome table and radius are fixed, so copy them now rather than
        // paying a round trip every time they're needed
        let proxy = OracleProxy {
            requests: sender,
            biomes: oracle.biomes().to_vec(),
            radius: oracle.radius(),
            timeout,
        };
        let host = Self {
            oracle,
            requests: receiver,
        };
        (host, proxy)
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Answer every request that's already waiting, without blocking.
    /// Returns the number of requests served.
    pub fn pump(&self) -> usize {
        let mut served = 0;
        while let Ok(request) = self.requests.try_recv() {
            self.serve(request);
            served += 1;
        }
        served
    }

    /// Answer requests as they arrive until `duration` has elapsed or every
    /// proxy has been dropped. Returns the number of requests served.
    pub fn pump_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut served = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.requests.recv_timeout(remaining) {
                Ok(request) => {
                    self.serve(request);
                    served += 1;
                }
                Err(RecvTimeoutError::Timeout)
                | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        served
    }

    /// Answer requests until every proxy has been dropped, i.e. until the
    /// worker is done. Returns the number of requests served.
    pub fn run(&self) -> usize {
        let mut served = 0;
        while let Ok(request) = self.requests.recv() {
            self.serve(request);
            served += 1;
        }
        served
    }

    fn serve(&self, request: Request) {
        trace!("Sampling {} points for worker", request.points.len());
        let reply = self.oracle.sample(&request.points);
        // If the worker gave up waiting, there's nobody left to tell
        let _ = request.reply.send(reply);
    }
}

impl TerrainOracle for OracleProxy {
    fn sample(&self, points: &[Coordinates]) -> Reply {
        let (reply, response) = bounded(1);
        let request = Request {
            points: points.to_vec(),
            reply,
        };
        self.requests
            .send_timeout(request, self.timeout)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => anyhow!(
                    "terrain host queue still full after {:?}",
                    self.timeout
                ),
                SendTimeoutError::Disconnected(_) => {
                    anyhow!("terrain host disconnected")
                }
            })?;
        response
            .recv_timeout(self.timeout)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => anyhow!(
                    "terrain host did not answer within {:?}",
                    self.timeout
                ),
                RecvTimeoutError::Disconnected => {
                    anyhow!("terrain host dropped request")
                }
            })?
    }

    fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    fn radius(&self) -> Meter {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Flat planet, tracks which thread served it
    struct Flat {
        host_thread: thread::ThreadId,
        biomes: Vec<Biome>,
    }

    impl TerrainOracle for Flat {
        fn sample(
            &self,
            points: &[Coordinates],
        ) -> anyhow::Result<Vec<TerrainSample>> {
            assert_eq!(thread::current().id(), self.host_thread);
            Ok(points
                .iter()
                .map(|point| TerrainSample {
                    height: Meter(point.y() * 100.0),
                    biome: Some(0),
                })
                .collect())
        }

        fn biomes(&self) -> &[Biome] {
            &self.biomes
        }

        fn radius(&self) -> Meter {
            Meter(10.0)
        }
    }

    fn flat() -> Flat {
        Flat {
            host_thread: thread::current().id(),
            biomes: vec![Biome::named("Plains")],
        }
    }

    #[test]
    fn test_round_trip() {
        let (host, proxy) = OracleHost::new(flat(), Duration::from_secs(10));
        assert_eq!(proxy.radius(), Meter(10.0));
        assert_eq!(proxy.biomes()[0].name, "Plains");

        let worker = thread::spawn(move || {
            let points = [
                Coordinates::new(0.0, 1.0, 0.0),
                Coordinates::new(0.0, -1.0, 0.0),
            ];
            let first = proxy.sample(&points).unwrap();
            let second = proxy.sample(&points[..1]).unwrap();
            (first, second)
        });
        assert_eq!(host.run(), 2);

        let (first, second) = worker.join().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].height, Meter(100.0));
        assert_eq!(first[1].height, Meter(-100.0));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_timeout() {
        let (host, proxy) =
            OracleHost::new(flat(), Duration::from_millis(20));
        // Nobody is pumping the host
        let err = proxy
            .sample(&[Coordinates::new(1.0, 0.0, 0.0)])
            .unwrap_err();
        assert!(err.to_string().contains("did not answer"), "{}", err);
        // The stale request is still answered, into the void
        assert_eq!(host.pump(), 1);
    }

    #[test]
    fn test_disconnected() {
        let (host, proxy) = OracleHost::new(flat(), Duration::from_secs(1));
        drop(host);
        let err = proxy
            .sample(&[Coordinates::new(1.0, 0.0, 0.0)])
            .unwrap_err();
        assert_eq!(err.to_string(), "terrain host disconnected");
    }

    #[test]
    fn test_pump_for_ends_on_disconnect() {
        let (host, proxy) = OracleHost::new(flat(), Duration::from_secs(1));
        drop(proxy);
        assert_eq!(host.pump_for(Duration::from_secs(60)), 0);
    }
}
