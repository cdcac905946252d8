use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// One sense with cited and collapsible examples
pub const SMALL_ARTICLE: &str = r#"<btw:entry>
  <btw:lemma>prajñā</btw:lemma>
  <btw:sense-discrimination>
    <btw:sense xml:id="S.0">
      <btw:english-renditions>
        <btw:english-rendition><btw:term>wisdom</btw:term></btw:english-rendition>
      </btw:english-renditions>
      <btw:explanation>insight into things as they are</btw:explanation>
      <btw:citations>
        <btw:example xml:id="E.0"><btw:cit><ref target="/bibl/1">AKBh</ref></btw:cit></btw:example>
      </btw:citations>
      <btw:other-citations>
        <btw:example xml:id="E.1"><btw:cit><ref target="/bibl/2">Vism</ref></btw:cit></btw:example>
      </btw:other-citations>
    </btw:sense>
  </btw:sense-discrimination>
</btw:entry>"#;

/// Create a temporary data directory
pub fn create_test_data_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a file in the data directory with content
pub fn create_test_file(data_dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = data_dir.path().join(filename);
    fs::write(&file_path, content).unwrap();
    file_path
}
