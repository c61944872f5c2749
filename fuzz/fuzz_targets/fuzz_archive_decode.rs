#![no_main]

use libfuzzer_sys::fuzz_target;

use pollroom::storage::ArchiveDocument;

fuzz_target!(|data: &str| {
    // Fuzz the archive decoder with arbitrary strings. A corrupt or
    // hand-edited data file must never panic -- only return Ok/Err.
    let decoded = serde_json::from_str::<ArchiveDocument>(data);

    // Anything that decodes must also re-encode cleanly.
    if let Ok(doc) = decoded {
        let _ = serde_json::to_string(&doc);
    }
});
