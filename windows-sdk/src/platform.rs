// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Platform.xml` parsing for Windows UAP SDKs.
//!
//! Every UAP SDK version ships a `Platforms/UAP/<version>/Platform.xml`
//! describing the platform version and the API contracts it contains. e.g.
//!
//! ```xml
//! <ApplicationPlatform name="UAP" version="10.0.18362.0">
//!   <ContainedApiContracts>
//!     <ApiContract name="Windows.Foundation.FoundationContract" version="3.0.0.0" />
//!   </ContainedApiContracts>
//! </ApplicationPlatform>
//! ```

use {
    crate::{api_contract_identifier, Error, FileSystem, SdkReference, WindowsUapSdk},
    log::debug,
    std::{io::Read, path::PathBuf},
    xml::{
        attribute::OwnedAttribute,
        reader::{EventReader, XmlEvent},
    },
};

/// An API contract declared by a UAP platform.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ApiContract {
    pub name: String,
    pub version: String,
}

impl ApiContract {
    /// The path identifier resolving to this contract's `.winmd` file.
    pub fn path_identifier(&self) -> String {
        api_contract_identifier(&self.name, &self.version)
    }
}

/// The parsed content of a `Platform.xml` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplicationPlatform {
    /// The platform version declared by the root element.
    pub version: String,

    /// API contracts from all `ContainedApiContracts` elements, in document order.
    pub api_contracts: Vec<ApiContract>,
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}

impl ApplicationPlatform {
    /// Parse `Platform.xml` content from a reader.
    ///
    /// The root element must be `ApplicationPlatform` with a non-empty
    /// `version` attribute and must have at least one `ContainedApiContracts`
    /// child. Elements other than `ApiContract` within it are ignored.
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let mut version = None;
        let mut api_contracts = vec![];
        let mut contract_lists = 0;
        let mut in_contract_list = false;
        let mut depth = 0usize;

        for event in EventReader::new(reader) {
            match event? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    depth += 1;

                    match depth {
                        1 => {
                            if name.local_name != "ApplicationPlatform" {
                                return Err(Error::InvalidPlatformXml(format!(
                                    "unexpected root element {}",
                                    name.local_name
                                )));
                            }

                            version = attribute(&attributes, "version")
                                .filter(|v| !v.is_empty())
                                .map(|v| v.to_string());
                        }
                        2 if name.local_name == "ContainedApiContracts" => {
                            contract_lists += 1;
                            in_contract_list = true;
                        }
                        3 if in_contract_list && name.local_name == "ApiContract" => {
                            let (Some(name), Some(version)) = (
                                attribute(&attributes, "name"),
                                attribute(&attributes, "version"),
                            ) else {
                                return Err(Error::InvalidPlatformXml(
                                    "ApiContract missing name or version attribute".into(),
                                ));
                            };

                            api_contracts.push(ApiContract {
                                name: name.to_string(),
                                version: version.to_string(),
                            });
                        }
                        _ => {}
                    }
                }
                XmlEvent::EndElement { .. } => {
                    if depth == 2 {
                        in_contract_list = false;
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        let version = version
            .ok_or_else(|| Error::InvalidPlatformXml("no version attribute found".into()))?;

        if contract_lists == 0 {
            return Err(Error::InvalidPlatformXml(
                "ContainedApiContracts element not found".into(),
            ));
        }

        Ok(Self {
            version,
            api_contracts,
        })
    }

    /// Parse `Platform.xml` content from a string.
    pub fn from_xml(s: &str) -> Result<Self, Error> {
        Self::from_reader(s.as_bytes())
    }
}

impl WindowsUapSdk {
    /// Read and parse this SDK's `Platform.xml`.
    ///
    /// Errors if the declared platform version differs from the SDK version.
    pub fn read_platform(&self, fs: &impl FileSystem) -> Result<ApplicationPlatform, Error> {
        let path = self.platform_xml_path();
        debug!("parsing {}", path.display());

        let data = fs.read(&path)?;
        let platform = ApplicationPlatform::from_reader(data.as_slice())?;

        if platform.version != self.sdk_version().as_ref() {
            return Err(Error::PlatformVersionMismatch {
                expected: self.sdk_version().to_string(),
                actual: platform.version,
            });
        }

        Ok(platform)
    }

    /// Resolve the `.winmd` paths of every API contract this SDK declares.
    ///
    /// Paths are returned in document order and aren't validated to exist.
    pub fn api_contract_winmd_paths(&self, fs: &impl FileSystem) -> Result<Vec<PathBuf>, Error> {
        self.read_platform(fs)?
            .api_contracts
            .iter()
            .map(|contract| self.require_path(&contract.path_identifier()))
            .collect()
    }
}
