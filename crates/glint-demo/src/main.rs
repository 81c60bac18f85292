mod scenes;

use anyhow::{bail, Result};
use winit::dpi::LogicalSize;

use glint_engine::frame::FrameTick;
use glint_engine::logging::{init_logging, LoggingConfig};
use glint_engine::scene::Scene;
use glint_engine::window::{App, Runtime, RuntimeConfig, WindowContext};

use scenes::SceneKind;

struct Demo {
    kind: SceneKind,
    aspect: f32,
    scene: Option<Scene>,
}

impl App for Demo {
    fn setup(&mut self, ctx: &mut WindowContext) -> glint_engine::Result<()> {
        self.scene = Some(scenes::build(ctx, self.kind, self.aspect)?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut WindowContext, tick: FrameTick) -> glint_engine::Result<()> {
        match &self.scene {
            Some(scene) => scene.render(ctx, tick.rotation),
            None => Ok(()),
        }
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
        if let Some(scene) = self.scene.as_mut() {
            scene.set_projection(scenes::projection(self.aspect));
        }
    }

    fn teardown(&mut self, ctx: &mut WindowContext) {
        if let Some(scene) = self.scene.take() {
            scene.destroy(ctx);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let name = std::env::args().nth(1).unwrap_or_else(|| "shapes".to_string());
    let Some(kind) = SceneKind::parse(&name) else {
        bail!("unknown scene `{name}` (expected triangle, shapes or cube)");
    };

    let config = RuntimeConfig {
        title: kind.title().to_string(),
        initial_size: LogicalSize::new(640.0, 480.0),
        ..RuntimeConfig::default()
    };

    Runtime::run(
        config,
        Demo {
            kind,
            aspect: 640.0 / 480.0,
            scene: None,
        },
    )
}
