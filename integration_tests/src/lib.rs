#[cfg(test)]
mod integration {
    use std::net::TcpListener;
    use std::sync::mpsc::{self, Receiver};
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    use anyhow::Result;
    use bevy_app::App;
    use bevy_time::Time;
    use client::net::{LiveDirector, WsConnector};
    use client::{build_minimal_client_app, Args as ClientArgs, ClientConfig, Director, PendingIntents};
    use protocol::{decode, encode, ClientMessage, ServerMessage};
    use scene_sync::session::ChannelTransport;
    use scene_sync::{DirectorSettings, Intent, PumpReport, SceneDirector, SessionState};
    use tungstenite::Message;

    const DEADLINE: Duration = Duration::from_secs(5);
    const FRAME_DT: f32 = 1.0 / 60.0;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn advance_app(app: &mut App, dt: f32) {
        if let Some(mut time) = app.world_mut().get_resource_mut::<Time>() {
            time.advance_by(Duration::from_secs_f32(dt));
        }
        app.update();
    }

    fn build_frame() -> String {
        serde_json::json!({
            "type": "build",
            "r_CM": [0.1, 0.0, 0.0],
            "r_ra": [-1.5, 0.0, 0.0],
            "V_max": 44.4,
            "psi_ra_max": 0.26,
            "panels": {
                "FL": {
                    "r_LE_1": [0.0, 0.0, 0.0],
                    "r_LE_2": [0.0, -1.0, 0.0],
                    "r_TE_1": [0.3, 0.0, 0.0],
                    "r_TE_2": [0.3, -1.0, 0.0],
                    "rear": false
                },
                "RL": {
                    "r_LE_1": [0.0, 0.0, 0.0],
                    "r_LE_2": [0.0, -0.5, 0.0],
                    "r_TE_1": [0.2, 0.0, 0.0],
                    "r_TE_2": [0.2, -0.5, 0.0],
                    "rear": true
                }
            },
            "hull": { "r_surf": [0.5, 0.0, 0.1] },
            "propulsor": { "r_prop": [-1.5, 0.0, 0.6], "d": 0.2 }
        })
        .to_string()
    }

    fn telem_frame() -> String {
        serde_json::json!({
            "type": "telem",
            "running": false,
            "U": [4.0, 0.0, 0.0],
            "r": [10.0, 2.0, -0.3],
            "panels": {
                "FL": { "f": 1.0, "one_lower": true, "F": [0.0, 0.0, -900.0] },
                "RL": { "f": 0.25, "one_lower": false }
            }
        })
        .to_string()
    }

    /// Accepts one client, sends `frames`, forwards the next `expect` text
    /// frames the client sends, then closes.
    struct MockSim {
        url: String,
        received: Receiver<String>,
        handle: JoinHandle<()>,
    }

    impl MockSim {
        fn start(frames: Vec<String>, expect: usize) -> Result<Self> {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            let url = format!("ws://{}", listener.local_addr()?);
            let (tx, received) = mpsc::channel();
            let handle = thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept");
                let mut ws = tungstenite::accept(stream).expect("handshake");
                for frame in frames {
                    ws.send(Message::text(frame)).expect("send frame");
                }
                let mut seen = 0;
                while seen < expect {
                    match ws.read() {
                        Ok(Message::Text(text)) => {
                            seen += 1;
                            let _ = tx.send(text.as_str().to_owned());
                        }
                        Ok(_) => {}
                        Err(_) => return,
                    }
                }
                let _ = ws.close(None);
                while ws.read().is_ok() {}
            });
            Ok(Self {
                url,
                received,
                handle,
            })
        }

        fn next(&self) -> String {
            self.received.recv_timeout(DEADLINE).expect("client frame")
        }
    }

    fn live_director(url: &str) -> LiveDirector {
        SceneDirector::new(
            ChannelTransport::new(WsConnector),
            DirectorSettings {
                url: url.to_string(),
                ..Default::default()
            },
        )
    }

    /// Pumps until `done` holds for the accumulated report.
    fn pump_until(director: &mut LiveDirector, done: impl Fn(&PumpReport) -> bool) -> PumpReport {
        let start = Instant::now();
        let mut total = PumpReport::default();
        while !done(&total) {
            assert!(start.elapsed() < DEADLINE, "timed out; got {total:?}");
            let report = director.pump();
            total.statuses.extend(report.statuses);
            total.builds += report.builds;
            total.telems += report.telems;
            total.unknown += report.unknown;
            thread::sleep(Duration::from_millis(5));
        }
        total
    }

    #[test]
    fn fixture_frames_decode() -> Result<()> {
        assert!(matches!(
            decode::<ServerMessage>(&build_frame())?,
            ServerMessage::Build(build) if build.panels.len() == 2 && build.panels["RL"].rear
        ));
        assert!(matches!(
            decode::<ServerMessage>(&telem_frame())?,
            ServerMessage::Telem(_)
        ));
        Ok(())
    }

    #[test]
    fn websocket_session_builds_syncs_and_closes() -> Result<()> {
        init_tracing();
        let sim = MockSim::start(vec![build_frame(), telem_frame()], 1)?;
        let mut director = live_director(&sim.url);
        assert!(director.connect());

        let report = pump_until(&mut director, |r| r.builds >= 1 && r.telems >= 1);
        assert_eq!(report.statuses.first(), Some(&SessionState::Connected));
        assert_eq!(director.registry().panels().len(), 2);
        let rear = director.registry().panel("RL").expect("rear panel");
        assert_eq!(
            director.tree().parent(rear.wet_mesh()),
            Some(director.vehicle().rear_axle())
        );
        let front = director.registry().panel("FL").expect("front panel");
        assert_eq!(front.fraction(), 1.0);
        assert_eq!(director.control_panel().sim().velocity.x, 4.0);

        director.handle_intent(Intent::Export);
        assert_eq!(sim.next(), encode(&ClientMessage::Export)?);

        pump_until(&mut director, |r| r.statuses.contains(&SessionState::Idle));
        assert_eq!(director.control_panel().status_text(), "Disconnected");
        assert!(director.control_panel().connect_enabled());
        sim.handle.join().expect("mock sim thread");
        Ok(())
    }

    #[test]
    fn refused_connection_reports_error_and_allows_retry() -> Result<()> {
        init_tracing();
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let mut director = live_director(&format!("ws://127.0.0.1:{port}"));
        assert!(director.connect());
        let report = pump_until(&mut director, |r| r.statuses.contains(&SessionState::Idle));
        assert!(report.statuses.contains(&SessionState::Error));
        assert_eq!(director.control_panel().status_text(), "Error");
        assert!(director.control_panel().connect_enabled());
        Ok(())
    }

    #[test]
    fn minimal_app_pumps_frames_and_forwards_intents() -> Result<()> {
        init_tracing();
        let sim = MockSim::start(vec![build_frame(), telem_frame()], 1)?;
        let args = ClientArgs {
            url: sim.url.clone(),
            headless: true,
            ..Default::default()
        };
        let mut app = build_minimal_client_app(args, ClientConfig::default());

        let start = Instant::now();
        loop {
            advance_app(&mut app, FRAME_DT);
            let director = app.world().resource::<Director>().lock();
            if director.control_panel().frames() >= 1 {
                assert_eq!(director.registry().panels().len(), 2);
                break;
            }
            drop(director);
            assert!(start.elapsed() < DEADLINE, "no telemetry reached the app");
            thread::sleep(Duration::from_millis(5));
        }

        app.world_mut()
            .resource_mut::<PendingIntents>()
            .push(Intent::Step);
        advance_app(&mut app, FRAME_DT);
        assert_eq!(sim.next(), encode(&ClientMessage::Step { dt: 0.1 })?);

        let stats = *app.world().resource::<client::LinkStats>();
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.telems, 1);
        Ok(())
    }
}
