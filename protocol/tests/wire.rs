use protocol::{
    decode, encode, ClientMessage, RowMajor3, ServerMessage, StateName, StateValue,
};

const BUILD: &str = r#"{
    "type": "build",
    "r_CM": [1.2, 0.0, -0.3],
    "r_ra": [-1.5, 0.0, 0.1],
    "V_max": 44.4,
    "psi_ra_max": 0.26,
    "panels": {
        "1L": {"r_LE_1": [0,0,0], "r_LE_2": [0,1,0], "r_TE_1": [1,0,0], "r_TE_2": [1,1,0], "rear": false},
        "r1R": {"r_LE_1": [0,0,0], "r_LE_2": [0,-1,0], "r_TE_1": [1,0,0], "r_TE_2": [1,-1,0], "rear": true}
    },
    "hull": {"r_surf": [0.4, 0.0, 0.2]},
    "propulsor": {"r_prop": [0.0, 0.0, 0.6], "d": 0.18},
    "methods": ["euler", "rk4"],
    "method": "rk4"
}"#;

#[test]
fn build_message_decodes_wire_names() {
    let ServerMessage::Build(build) = decode::<ServerMessage>(BUILD).unwrap() else {
        panic!("expected a build message");
    };
    assert_eq!(build.r_cm, [1.2, 0.0, -0.3]);
    assert_eq!(build.r_ra, [-1.5, 0.0, 0.1]);
    assert_eq!(build.panels.len(), 2);
    assert!(build.panels["r1R"].rear);
    assert!(!build.panels["1L"].rear);
    assert_eq!(build.panels["1L"].r_te_2, [1.0, 1.0, 0.0]);
    assert_eq!(build.propulsor.d, 0.18);
    assert_eq!(build.methods, vec!["euler".to_string(), "rk4".to_string()]);
    assert_eq!(build.method.as_deref(), Some("rk4"));
}

#[test]
fn partial_telemetry_fills_defaults() {
    let text = r#"{"type":"telem","running":true,"r":[1,2,3],
        "panels":{"1L":{"f":0.25,"one_lower":true,"F":[1,0,0]}}}"#;
    let ServerMessage::Telem(telem) = decode::<ServerMessage>(text).unwrap() else {
        panic!("expected a telem message");
    };
    assert!(telem.running);
    assert_eq!(telem.r, [1.0, 2.0, 3.0]);
    assert_eq!(telem.c0b, RowMajor3::IDENTITY);
    let panel = telem.panels["1L"];
    assert_eq!(panel.f, 0.25);
    assert!(panel.one_lower);
    assert_eq!(panel.force, [1.0, 0.0, 0.0]);
    assert_eq!(panel.moment, [0.0, 0.0, 0.0]);
    assert_eq!(panel.cbw, RowMajor3::IDENTITY);
    assert!(telem.wing_roots.is_empty());
}

#[test]
fn full_telemetry_field_names() {
    let text = r#"{"type":"telem",
        "U":[3,0,0.1],"omega":[0,0.1,0],"Phi":[0,0.05,1.0],"psi_ra":0.1,
        "C0b":[0,-1,0,1,0,0,0,0,1],"Cra_b":[1,0,0,0,1,0,0,0,1],
        "hull":{"F_h":[1,2,3],"M_b":[0,0,1],"surf":{"F":[5,0,0],"U_mag":2.0}},
        "wing_roots":{"0":{"F_f":[0,0,-9],"vol_center":[0.1,0.2,0.3]}},
        "propulsor":{"fp":0.8,"n":25.0,"I":12.5,"V":20.0,"T":150.0,"Q":3.0,"Cra_w":[1,0,0,0,1,0,0,0,1]}}"#;
    let ServerMessage::Telem(telem) = decode::<ServerMessage>(text).unwrap() else {
        panic!("expected a telem message");
    };
    assert_eq!(telem.u, [3.0, 0.0, 0.1]);
    assert_eq!(telem.phi[2], 1.0);
    assert_eq!(telem.c0b.at(0, 1), -1.0);
    assert_eq!(telem.hull.hydro_force, [1.0, 2.0, 3.0]);
    assert_eq!(telem.hull.surf.force, [5.0, 0.0, 0.0]);
    assert_eq!(telem.hull.surf.u_mag, 2.0);
    assert_eq!(telem.wing_roots["0"].foil_force, [0.0, 0.0, -9.0]);
    assert_eq!(telem.propulsor.n, 25.0);
    assert_eq!(telem.propulsor.current, 12.5);
    assert_eq!(telem.propulsor.thrust, 150.0);
}

#[test]
fn client_messages_match_server_contract() {
    let cases = [
        (ClientMessage::Sim, r#"{"type":"sim"}"#),
        (ClientMessage::Reset, r#"{"type":"reset"}"#),
        (ClientMessage::Reinit, r#"{"type":"reinit"}"#),
        (ClientMessage::Export, r#"{"type":"export"}"#),
        (ClientMessage::Step { dt: 0.5 }, r#"{"type":"step","dt":0.5}"#),
        (
            ClientMessage::Set {
                state: StateName::Rate,
                value: StateValue::Scalar(2.0),
            },
            r#"{"type":"set","state":"rate","value":2.0}"#,
        ),
        (
            ClientMessage::Set {
                state: StateName::Input,
                value: StateValue::Planar { x: 0.5, y: -1.0 },
            },
            r#"{"type":"set","state":"input","value":{"x":0.5,"y":-1.0}}"#,
        ),
        (
            ClientMessage::Set {
                state: StateName::Attitude,
                value: StateValue::Vector { x: 1.0, y: 2.0, z: 3.0 },
            },
            r#"{"type":"set","state":"Phi","value":{"x":1.0,"y":2.0,"z":3.0}}"#,
        ),
    ];
    for (msg, expected) in cases {
        assert_eq!(encode(&msg).unwrap(), expected);
    }
}

#[test]
fn state_values_decode_by_shape() {
    let planar: StateValue = decode(r#"{"x":0.1,"y":0.2}"#).unwrap();
    assert_eq!(planar, StateValue::Planar { x: 0.1, y: 0.2 });
    let vector: StateValue = decode(r#"{"x":0.1,"y":0.2,"z":0.3}"#).unwrap();
    assert_eq!(vector, StateValue::Vector { x: 0.1, y: 0.2, z: 0.3 });
    let scalar: StateValue = decode("4").unwrap();
    assert_eq!(scalar, StateValue::Scalar(4.0));
}

#[test]
fn malformed_json_is_reported() {
    assert!(decode::<ServerMessage>("{\"type\":\"telem\",").is_err());
    assert!(decode::<ServerMessage>(r#"{"type":"build","panels":3}"#).is_err());
}
