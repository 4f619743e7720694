use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use axum::response::Html;
use handlebars::{handlebars_helper, RenderError};
use serde::Serialize;

#[derive(Clone)]
pub struct Template {
    r: Arc<handlebars::Handlebars<'static>>,
}

impl Template {
    /// Registers every `.hbs` file in `dir` under its file name.
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        let mut handlebars = handlebars::Handlebars::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("cannot read templates directory {}", dir.display()))?;

        for entity in entries {
            let entity = entity?;
            let path = entity.path();
            if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }
            let name = entity.file_name().to_string_lossy().into_owned();
            handlebars
                .register_template_file(&name, &path)
                .with_context(|| format!("cannot register template {}", path.display()))?;
            log::debug!("registered template {}", name);
        }

        handlebars_helper!(nor_amt: |v: f64| format!("{:.02}", v));

        handlebars.register_helper("nor_amt", Box::new(nor_amt));
        Ok(Self {
            r: Arc::new(handlebars),
        })
    }

    pub fn render<T>(&self, name: &str, data: &T) -> Result<Html<String>, RenderError>
    where
        T: Serialize,
    {
        log::debug!("render '{}'", name);
        self.r.render(name, data).map(Html)
    }
}
