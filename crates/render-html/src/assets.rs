use crate::markup::ICON_SIZE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use rigsheet_core::{PageKind, PagePlan};
use rigsheet_render_core::{RenderContext, RenderError};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// A prepared JPEG inlined as a `data:` URI, with its pixel size.
pub(crate) struct EncodedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

fn encode(ctx: &RenderContext<'_>, path: &Path, width_pt: f32, height_pt: f32) -> Result<EncodedImage, RenderError> {
    let prepared = ctx.prepare_image(path, width_pt, height_pt)?;
    let info = rigsheet_resource::probe(&prepared.path)?;
    let bytes = fs::read(&prepared.path)?;
    Ok(EncodedImage {
        data_uri: format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)),
        width: info.width,
        height: info.height,
    })
}

/// Encodes images through the image cache. Icons are encoded once per path
/// up front; a broken icon only costs its own marker the picture.
pub(crate) struct AssetEncoder<'c, 'a> {
    ctx: &'c RenderContext<'a>,
    icons: HashMap<PathBuf, Option<String>>,
}

impl<'c, 'a> AssetEncoder<'c, 'a> {
    pub fn new(ctx: &'c RenderContext<'a>) -> Self {
        Self {
            ctx,
            icons: HashMap::new(),
        }
    }

    pub fn background(&self, path: &Path, width_pt: f32, height_pt: f32) -> Result<EncodedImage, RenderError> {
        encode(self.ctx, path, width_pt, height_pt)
    }

    pub fn prepare_icons(&mut self, plan: &PagePlan) -> Result<(), RenderError> {
        let paths: BTreeSet<&Path> = plan
            .pages
            .iter()
            .filter(|page| page.kind == PageKind::Visual)
            .flat_map(|page| plan.entries(page))
            .filter_map(|entry| entry.icon_path.as_deref())
            .collect();

        #[cfg(feature = "parallel-assets")]
        let encoded: Vec<_> = {
            use rayon::prelude::*;
            let ctx = self.ctx;
            paths
                .into_par_iter()
                .map(|path| (path, encode(ctx, path, ICON_SIZE, ICON_SIZE)))
                .collect()
        };
        #[cfg(not(feature = "parallel-assets"))]
        let encoded: Vec<_> = paths
            .into_iter()
            .map(|path| (path, encode(self.ctx, path, ICON_SIZE, ICON_SIZE)))
            .collect();

        for (path, result) in encoded {
            let uri = match result {
                Ok(image) => Some(image.data_uri),
                Err(RenderError::Cancelled) => return Err(RenderError::Cancelled),
                Err(e) => {
                    warn!("icon {} skipped: {}", path.display(), e);
                    None
                }
            };
            self.icons.insert(path.to_path_buf(), uri);
        }
        Ok(())
    }

    pub fn icon(&self, path: &Path) -> Option<&str> {
        self.icons.get(path).and_then(|uri| uri.as_deref())
    }
}
