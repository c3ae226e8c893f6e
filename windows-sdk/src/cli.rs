// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::{
    EnvironmentParameters, SdkDescription, SdkEnvironment, SdkKind, SdkReference, SearchRoots,
    VersionPredicate,
};
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Options controlling where and how SDKs are searched for.
#[derive(ClapArgs)]
pub struct SearchArgs {
    /// Accepted SDK version. Can be repeated. Any version if omitted.
    #[clap(long = "sdk-version")]
    pub sdk_versions: Vec<String>,
    /// Program Files directory to search. Can be repeated. Replaces the defaults.
    #[clap(long = "root")]
    pub roots: Vec<PathBuf>,
    /// Environment parameter as key=value, e.g. sdk.uap.install.location.<version>=<path>.
    #[clap(short = 'D', value_parser = parse_parameter)]
    pub parameters: Vec<(String, String)>,
}

fn parse_parameter(s: &str) -> Result<(String, String), crate::Error> {
    EnvironmentParameters::parse_assignment(s)
}

impl SearchArgs {
    fn environment(&self) -> SdkEnvironment {
        let env = SdkEnvironment::new(self.parameters.iter().cloned().collect());

        if self.roots.is_empty() {
            env
        } else {
            env.search_roots(
                self.roots
                    .iter()
                    .fold(SearchRoots::empty(), |roots, root| roots.root(root)),
            )
        }
    }

    fn versions(&self) -> VersionPredicate {
        self.sdk_versions.iter().cloned().collect()
    }

    fn description(&self, kind: SdkKind) -> SdkDescription {
        SdkDescription::for_kind(kind, self.versions())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Locates an SDK and prints its version and install location.
    ///
    /// Kind can be one of WindowsKits, WindowsUap or WindowsAppCertKit.
    Locate {
        kind: SdkKind,
        #[clap(flatten)]
        search: SearchArgs,
    },
    /// Resolves a path identifier such as include.um or exe.x64.signtool.
    Path {
        kind: SdkKind,
        identifier: String,
        /// Fail if the resolved path doesn't exist.
        #[clap(long)]
        must_exist: bool,
        #[clap(flatten)]
        search: SearchArgs,
    },
    /// Resolves a property identifier such as version.
    Property {
        kind: SdkKind,
        identifier: String,
        #[clap(flatten)]
        search: SearchArgs,
    },
    /// Prints the .winmd paths of the API contracts of a UAP SDK.
    ApiContracts {
        #[clap(flatten)]
        search: SearchArgs,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Self::Locate { kind, search } => {
                let sdk = search.environment().resolve(&search.description(kind))?;
                println!("kind: {}", sdk.kind().name());
                if let Some(version) = sdk.version() {
                    println!("version: {}", version);
                }
                println!("location: {}", sdk.base_directory().display());
            }
            Self::Path {
                kind,
                identifier,
                must_exist,
                search,
            } => {
                let sdk = search.environment().resolve(&search.description(kind))?;
                let path = sdk.require_path(&identifier)?;
                if must_exist && !path.exists() {
                    anyhow::bail!("{} does not exist in {}", path.display(), sdk);
                }
                println!("{}", path.display());
            }
            Self::Property {
                kind,
                identifier,
                search,
            } => {
                let sdk = search.environment().resolve(&search.description(kind))?;
                match sdk.property(&identifier) {
                    Some(value) => println!("{}", value),
                    None => anyhow::bail!("property {} not found in {}", identifier, sdk),
                }
            }
            Self::ApiContracts { search } => {
                for path in search
                    .environment()
                    .api_contract_winmd_paths(&search.versions())?
                {
                    println!("{}", path.display());
                }
            }
        }
        Ok(())
    }
}
