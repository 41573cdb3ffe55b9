use std::fs;
use std::path::{Path, PathBuf};

use xjc_driver::{HttpClientConfig, Launcher, ResourceFetcher, ResourceMaterializer};

pub const SIMPLE_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="order" type="xs:string"/>
</xs:schema>
"#;

pub const SIMPLE_BINDING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<jaxb:bindings xmlns:jaxb="https://jakarta.ee/xml/ns/jaxb" version="3.0"/>
"#;

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Materializer that never consults the system proxy and places its
/// temporary files in `temp_dir`
pub fn test_materializer(temp_dir: &Path) -> ResourceMaterializer {
    let config = HttpClientConfig {
        timeout_seconds: 5,
        retry_attempts: 0,
        use_system_proxy: false,
        ..Default::default()
    };
    ResourceMaterializer::new(ResourceFetcher::new(config).unwrap())
        .with_temp_dir(Some(temp_dir.to_path_buf()))
}

/// Shell script standing in for the JVM.
///
/// It records its arguments one per line, copies every `.xsd` argument into
/// a second file, prints a warning and an info line, writes one generated
/// class below the `-d` directory and exits with the configured code.
pub struct FakeXjc {
    pub script: PathBuf,
    pub args_file: PathBuf,
    pub seen_file: PathBuf,
}

impl FakeXjc {
    pub fn new(dir: &Path, exit_code: i32) -> Self {
        let args_file = dir.join("recorded-args.txt");
        let seen_file = dir.join("seen-schemas.txt");
        let script = dir.join("fake-xjc.sh");

        let body = format!(
            r#"printf '%s\n' "$@" > '{args}'
: > '{seen}'
dest=""
prev=""
for arg in "$@"; do
  case "$arg" in
    *.xsd) cat "$arg" >> '{seen}' ;;
  esac
  if [ "$prev" = "-d" ]; then dest="$arg"; fi
  prev="$arg"
done
echo "[WARNING] generating code"
echo "parsing a schema..."
if [ -n "$dest" ]; then
  mkdir -p "$dest/com/example"
  printf 'package com.example;\n\npublic class Order {{\n}}\n' > "$dest/com/example/Order.java"
fi
exit {code}
"#,
            args = args_file.display(),
            seen = seen_file.display(),
            code = exit_code
        );
        fs::write(&script, body).unwrap();

        Self {
            script,
            args_file,
            seen_file,
        }
    }

    /// `/bin/sh <script>`, keeping the default system properties
    pub fn launcher(&self) -> Launcher {
        Launcher {
            program: "/bin/sh".to_string(),
            jvm_options: vec![self.script.to_string_lossy().into_owned()],
            ..Launcher::default()
        }
    }

    pub fn was_run(&self) -> bool {
        self.args_file.exists()
    }

    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(&self.args_file)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Arguments after the `-D` system properties
    pub fn tool_args(&self) -> Vec<String> {
        self.recorded_args()
            .into_iter()
            .skip_while(|arg| arg.starts_with("-D"))
            .collect()
    }

    pub fn seen_schemas(&self) -> String {
        fs::read_to_string(&self.seen_file).unwrap_or_default()
    }
}
