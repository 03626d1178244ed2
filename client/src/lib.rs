use bevy::asset::AssetPlugin;
use bevy::prelude::*;

pub mod args;
pub mod config;
#[cfg(feature = "windowing")]
pub mod hud_controls;
pub mod net;
pub mod scene;

pub use args::Args;
pub use config::ClientConfig;
#[cfg(feature = "windowing")]
use hud_controls::HudControlsPlugin;
pub use net::{Director, LinkStats, NetSet, PendingIntents};
use scene::ScenePlugin;

#[cfg(feature = "windowing")]
use bevy_egui::EguiPlugin;
#[cfg(feature = "windowing")]
use bevy_inspector_egui::quick::WorldInspectorPlugin;

#[derive(Clone, Copy)]
struct ClientAppConfig {
    include_rendering: bool,
    include_ui: bool,
    include_scene: bool,
}

impl ClientAppConfig {
    fn full(args: &Args) -> Self {
        Self {
            include_rendering: !args.headless,
            include_ui: !args.headless,
            include_scene: !args.headless,
        }
    }

    const MINIMAL: Self = Self {
        include_rendering: false,
        include_ui: false,
        include_scene: false,
    };
}

pub fn build_client_app(args: Args, config: ClientConfig) -> App {
    let app_config = ClientAppConfig::full(&args);
    build_client_app_with_config(args, config, app_config)
}

/// No window, no renderer, no scene mirror: the director, its socket and
/// the intent queue only.
pub fn build_minimal_client_app(args: Args, config: ClientConfig) -> App {
    build_client_app_with_config(args, config, ClientAppConfig::MINIMAL)
}

fn build_client_app_with_config(
    args: Args,
    config: ClientConfig,
    app_config: ClientAppConfig,
) -> App {
    let mut app = App::new();

    if app_config.include_rendering {
        app.add_plugins(DefaultPlugins.set(AssetPlugin {
            file_path: args.assets.to_string_lossy().into_owned(),
            ..Default::default()
        }));
        #[cfg(feature = "windowing")]
        if app_config.include_ui {
            app.add_plugins(EguiPlugin::default());
            if args.inspector {
                app.add_plugins(WorldInspectorPlugin::default());
            }
            app.add_plugins(HudControlsPlugin);
        }
    } else {
        app.add_plugins(MinimalPlugins);
    }

    app.insert_resource(Director::from_config(&args, &config))
        .insert_resource(args)
        .insert_resource(config)
        .init_resource::<PendingIntents>()
        .init_resource::<LinkStats>()
        .add_systems(Startup, net::client_connect)
        .add_systems(
            Update,
            (net::apply_intents, net::pump_director)
                .chain()
                .in_set(NetSet),
        );

    if app_config.include_scene {
        app.add_plugins(ScenePlugin);
    }

    app
}
