use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::error::FetchError;
use crate::source::DesignSource;

pub const ITIS_FILE: &str = "ITIs";

/// Lines of the ITI file and of every requested design file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DesignFiles {
    #[serde(rename = "ITIs")]
    pub itis: Vec<String>,
    #[serde(flatten)]
    pub files: BTreeMap<String, Vec<String>>,
}

impl DesignFiles {
    /// Every requested name present and empty.
    pub fn empty<N: AsRef<str>>(names: &[N]) -> Self {
        Self {
            itis: Vec::new(),
            files: names
                .iter()
                .map(|name| (name.as_ref().to_owned(), Vec::new()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.itis.is_empty() && self.files.values().all(Vec::is_empty)
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

/// Fetches the ITIs first, then every named file concurrently. Any failure
/// yields empty lists for everything.
pub async fn load_designs_and_itis<S, N>(source: &S, design_number: u32, names: &[N]) -> DesignFiles
where
    S: DesignSource + ?Sized,
    N: AsRef<str>,
{
    match try_load(source, design_number, names).await {
        Ok(files) => {
            info!(
                design_number,
                itis = files.itis.len(),
                files = files.files.len(),
                "design files loaded"
            );
            files
        }
        Err(err) => {
            error!(design_number, error = %err, "problem loading design files");
            DesignFiles::empty(names)
        }
    }
}

/// Like [`load_designs_and_itis`] but reports the first failure.
pub async fn try_load<S, N>(
    source: &S,
    design_number: u32,
    names: &[N],
) -> Result<DesignFiles, FetchError>
where
    S: DesignSource + ?Sized,
    N: AsRef<str>,
{
    let itis = split_lines(&source.fetch(design_number, ITIS_FILE).await?);

    let texts = try_join_all(
        names
            .iter()
            .map(|name| source.fetch(design_number, name.as_ref())),
    )
    .await?;

    let files = names
        .iter()
        .zip(texts)
        .map(|(name, text)| (name.as_ref().to_owned(), split_lines(&text)))
        .collect();
    Ok(DesignFiles { itis, files })
}
