use crate::config::{
    Configuration, Watch,
    rt::{RtcGenerate, RtcRun},
};
use anyhow::anyhow;
use std::{ops::Deref, path::PathBuf, sync::Arc};

/// Runtime config for the watch system.
#[derive(Clone, Debug)]
pub struct RtcWatch {
    /// Runtime config for the generate system.
    pub generate: Arc<RtcGenerate>,
    /// Paths to watch, always including the generate root.
    pub paths: Vec<PathBuf>,
    /// Paths to ignore.
    pub ignored_paths: Vec<PathBuf>,
    /// The process to restart after each successful generation.
    pub run: Option<Arc<RtcRun>>,
}

impl Deref for RtcWatch {
    type Target = RtcGenerate;

    fn deref(&self) -> &Self::Target {
        &self.generate
    }
}

impl RtcWatch {
    /// Construct a new instance.
    pub fn new(config: Configuration, working_directory: PathBuf) -> anyhow::Result<Self> {
        let Watch { watch, ignore } = config.watch.clone();
        let run = config.run.clone();

        let generate = RtcGenerate::new(config, working_directory)?;

        // Take the canonical path of each of the specified watch targets.
        let mut paths = vec![generate.root.clone()];
        for path in watch {
            let path = generate.working_directory.join(path);
            let canon_path = path.canonicalize().map_err(|_| {
                anyhow!(
                    "error taking the canonical path to the watch path: {:?}",
                    path
                )
            })?;
            if !paths.contains(&canon_path) {
                paths.push(canon_path);
            }
        }

        // Take the canonical path of each of the specified ignore targets.
        let mut ignored_paths = ignore
            .into_iter()
            .map(|path| {
                let path = generate.working_directory.join(path);
                path.canonicalize().map_err(|_| {
                    anyhow!(
                        "error taking the canonical path to the watch ignore path: {:?}",
                        path
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Ensure a dedicated output directory is always ignored, if it already exists.
        if let Some(out_dir) = generate.out_dir.as_ref().and_then(|p| p.canonicalize().ok()) {
            ignored_paths.push(out_dir);
        }

        let run = RtcRun::new(run, generate.working_directory.clone()).map(Arc::new);

        Ok(Self {
            generate: Arc::new(generate),
            paths,
            ignored_paths,
            run,
        })
    }
}
