use std::{ffi::OsString, path::Path};

use crate::context::Converter;

/// Inputs containing this make the fake converter exit with status 3.
pub(crate) const FAIL_MARKER: &str = "FAIL_CONVERSION";
/// Inputs containing this make the fake converter extract one image.
pub(crate) const IMAGE_MARKER: &str = "WITH_IMAGE";

const SCRIPT: &str = r#"
media=""; out=""; input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --extract-media=*) media="${1#--extract-media=}" ;;
    -t) shift ;;
    -o) shift; out="$1" ;;
    *) input="$1" ;;
  esac
  shift
done
if grep -q FAIL_CONVERSION "$input"; then
  echo "cannot read $input" >&2
  exit 3
fi
echo "converting $input" >&2
cat "$input" > "$out"
if grep -q WITH_IMAGE "$input"; then
  mkdir -p "$media/media"
  printf 'png' > "$media/media/img1.png"
  printf '\n![](%s/media/img1.png)\n' "$media" >> "$out"
fi
"#;

/// Stand-in for pandoc: copies the input to the output path. Run through `sh`
/// so the script itself never has to be executable.
pub(crate) fn fake_converter(dir: &Path) -> Converter {
    let script = dir.join("fake-converter.sh");
    std::fs::write(&script, SCRIPT).unwrap();
    Converter {
        program: "sh".into(),
        leading_args: vec![OsString::from(script)],
        ..Converter::default()
    }
}
