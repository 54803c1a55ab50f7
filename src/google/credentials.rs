//! Loading of the two values every cloud-facing component depends on:
//! the service-account key path and the Firebase Storage bucket.
//!
//! Sources are consulted in the order they were added; the first source
//! that defines a key wins, even if its value is empty. An empty value is
//! rejected rather than falling through to a later source.

use crate::error::ConfigError;
use std::{
    collections::HashMap,
    ffi::OsString,
    fs::File,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const CREDENTIALS_KEY: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const STORAGE_BUCKET_KEY: &str = "FIREBASE_STORAGE_BUCKET";

/// Validated cloud credentials, exactly as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCredentials {
    pub credentials_path: PathBuf,
    pub storage_bucket: String,
}

impl CloudCredentials {
    pub fn as_pair(&self) -> (&Path, &str) {
        (self.credentials_path.as_path(), self.storage_bucket.as_str())
    }
}

/// A place named configuration values can be looked up in. Values are raw
/// OS strings so paths survive byte for byte.
pub trait ConfigSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<OsString>;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// Entries parsed from a dotenv-style `KEY=value` file. Parsing does not
/// touch the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    entries: HashMap<String, String>,
}

impl EnvFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let entries = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        debug!(path = %path.display(), count = entries.len(), "env file parsed");
        Ok(Self { entries })
    }

    /// Like [`EnvFile::read`], but a missing file yields an empty source.
    pub fn read_optional(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "env file not found; skipping");
            return Ok(Self::default());
        }
        Self::read(path)
    }
}

impl ConfigSource for EnvFile {
    fn lookup(&self, key: &str) -> Option<OsString> {
        self.entries.get(key).map(OsString::from)
    }
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<OsString> {
        self.get(key).map(OsString::from)
    }
}

impl ConfigSource for HashMap<String, OsString> {
    fn lookup(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

#[derive(Default)]
pub struct CredentialLoader {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl CredentialLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process environment first, then the env file at `env_file` if present.
    pub fn layered(env_file: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new()
            .with_source(ProcessEnv)
            .with_source(EnvFile::read_optional(env_file)?))
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Resolve and validate both values. Fails on the first missing or empty
    /// key, checking the credentials key before the bucket.
    pub fn load(&self) -> Result<CloudCredentials, ConfigError> {
        let credentials_path = PathBuf::from(self.require(CREDENTIALS_KEY)?);
        let storage_bucket = self
            .require(STORAGE_BUCKET_KEY)?
            .into_string()
            .map_err(|_| {
                ConfigError::Invalid(format!("{STORAGE_BUCKET_KEY} is not valid UTF-8"))
            })?;
        ensure_readable_file(&credentials_path)?;
        Ok(CloudCredentials {
            credentials_path,
            storage_bucket,
        })
    }

    fn require(&self, key: &'static str) -> Result<OsString, ConfigError> {
        self.sources
            .iter()
            .find_map(|source| source.lookup(key))
            .filter(|value| !value.to_string_lossy().trim().is_empty())
            .ok_or(ConfigError::MissingKey { key })
    }
}

fn ensure_readable_file(path: &Path) -> Result<(), ConfigError> {
    let unreadable = |source| ConfigError::CredentialFileUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let meta = File::open(path)
        .and_then(|f| f.metadata())
        .map_err(unreadable)?;
    if !meta.is_file() {
        return Err(unreadable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn key_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("temp key file");
        f.write_all(br#"{"type":"service_account"}"#).expect("write key");
        f
    }

    #[test]
    fn returns_configured_values_unchanged() {
        Jail::expect_with(|jail| {
            jail.create_file("key.json", r#"{"type":"service_account"}"#)?;
            let loader = CredentialLoader::new().with_source(source(&[
                (CREDENTIALS_KEY, "key.json"),
                (STORAGE_BUCKET_KEY, "demo.appspot.com"),
            ]));
            let creds = loader.load().expect("credentials load");
            assert_eq!(
                creds.as_pair(),
                (Path::new("key.json"), "demo.appspot.com")
            );
            Ok(())
        });
    }

    #[test]
    fn missing_bucket_is_named() {
        let key = key_file();
        let loader = CredentialLoader::new().with_source(source(&[(
            CREDENTIALS_KEY,
            key.path().to_str().unwrap(),
        )]));
        let err = loader.load().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                key: STORAGE_BUCKET_KEY
            }
        ));
        assert!(err.to_string().contains("FIREBASE_STORAGE_BUCKET"));
    }

    #[test]
    fn missing_both_reports_credentials_first() {
        let err = CredentialLoader::new()
            .with_source(source(&[]))
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                key: CREDENTIALS_KEY
            }
        ));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let key = key_file();
        let loader = CredentialLoader::new().with_source(source(&[
            (CREDENTIALS_KEY, key.path().to_str().unwrap()),
            (STORAGE_BUCKET_KEY, "   "),
        ]));
        assert!(matches!(
            loader.load(),
            Err(ConfigError::MissingKey {
                key: STORAGE_BUCKET_KEY
            })
        ));
    }

    #[test]
    fn no_default_credentials_path_is_injected() {
        Jail::expect_with(|jail| {
            jail.create_file("serviceAccountKey.json", "{}")?;
            let loader = CredentialLoader::new()
                .with_source(source(&[(STORAGE_BUCKET_KEY, "demo.appspot.com")]));
            assert!(matches!(
                loader.load(),
                Err(ConfigError::MissingKey {
                    key: CREDENTIALS_KEY
                })
            ));
            Ok(())
        });
    }

    #[test]
    fn unreadable_credentials_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let loader = CredentialLoader::new().with_source(source(&[
            (CREDENTIALS_KEY, missing.to_str().unwrap()),
            (STORAGE_BUCKET_KEY, "demo.appspot.com"),
        ]));
        assert!(matches!(
            loader.load(),
            Err(ConfigError::CredentialFileUnreadable { .. })
        ));

        let as_dir = CredentialLoader::new().with_source(source(&[
            (CREDENTIALS_KEY, dir.path().to_str().unwrap()),
            (STORAGE_BUCKET_KEY, "demo.appspot.com"),
        ]));
        assert!(matches!(
            as_dir.load(),
            Err(ConfigError::CredentialFileUnreadable { .. })
        ));
    }

    #[test]
    fn env_file_supplies_values() {
        Jail::expect_with(|jail| {
            jail.create_file("key.json", "{}")?;
            jail.create_file(
                ".env",
                "# credentials\nGOOGLE_APPLICATION_CREDENTIALS=key.json\nFIREBASE_STORAGE_BUCKET=\"demo.appspot.com\"\n",
            )?;
            let creds = CredentialLoader::new()
                .with_source(EnvFile::read(Path::new(".env")).expect("env file"))
                .load()
                .expect("credentials load");
            assert_eq!(creds.storage_bucket, "demo.appspot.com");
            assert_eq!(creds.credentials_path, PathBuf::from("key.json"));
            Ok(())
        });
    }

    #[test]
    fn process_env_overrides_env_file() {
        Jail::expect_with(|jail| {
            jail.create_file("key.json", "{}")?;
            jail.create_file(
                ".env",
                "GOOGLE_APPLICATION_CREDENTIALS=key.json\nFIREBASE_STORAGE_BUCKET=file-bucket\n",
            )?;
            jail.set_env(CREDENTIALS_KEY, "key.json");
            jail.set_env(STORAGE_BUCKET_KEY, "env-bucket");
            let creds = CredentialLoader::layered(Path::new(".env"))
                .expect("layered sources")
                .load()
                .expect("credentials load");
            assert_eq!(creds.storage_bucket, "env-bucket");
            Ok(())
        });
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_credentials_path_is_kept_byte_for_byte() {
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        let key = dir
            .path()
            .join(OsString::from_vec(b"key-\xff.json".to_vec()));
        std::fs::write(&key, "{}").expect("write key");

        let loader = CredentialLoader::new().with_source(HashMap::from([
            (CREDENTIALS_KEY.to_string(), key.clone().into_os_string()),
            (STORAGE_BUCKET_KEY.to_string(), OsString::from("demo.appspot.com")),
        ]));
        let creds = loader.load().expect("credentials load");
        assert_eq!(creds.credentials_path, key);

        Jail::expect_with(|jail| {
            // registered with the jail so the variable is restored afterwards
            jail.set_env(CREDENTIALS_KEY, "placeholder");
            jail.set_env(STORAGE_BUCKET_KEY, "demo.appspot.com");
            // SAFETY: Jail serializes every test that touches the environment.
            unsafe { std::env::set_var(CREDENTIALS_KEY, key.as_os_str()) };
            let creds = CredentialLoader::new()
                .with_source(ProcessEnv)
                .load()
                .expect("credentials load from process env");
            assert_eq!(creds.credentials_path, key);
            Ok(())
        });
    }

    #[test]
    fn absent_env_file_is_skipped() {
        Jail::expect_with(|_jail| {
            let file = EnvFile::read_optional(Path::new("does-not-exist.env"))
                .expect("missing env file tolerated");
            assert!(file.lookup(CREDENTIALS_KEY).is_none());
            Ok(())
        });
    }
}
