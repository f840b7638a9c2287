// This file is part of the tradeloop engine.
// Copyright (C) 2026 Tradeloop Contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::de::DeserializeOwned;

/// Environment variable prefix every deployment's configuration is read from, e.g.
/// `APP__DISCOVERY__MAX_LOOP_LENGTH=12`.
const ENV_PREFIX: &str = "APP__";

/// Optional YAML file consulted before environment variables, which always take precedence.
const CONFIG_FILE_ENV_VAR: &str = "CONFIG_FILE";

/// Blanket extension implemented for every `Config` type in the workspace, mirroring the
/// pattern used by every `application::Config`/`Config::load()` call site.
pub trait ConfigExt
where
    Self: DeserializeOwned,
{
    fn load() -> Result<Self, figment::Error> {
        let mut figment = Figment::new();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV_VAR) {
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

impl<T> ConfigExt for T where T: DeserializeOwned {}
