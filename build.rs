fn main() {
    let now = time::OffsetDateTime::now_utc();
    let stamp = |env: &str, pattern: &str| {
        std::env::var(env).unwrap_or_else(|_| {
            time::format_description::parse(pattern)
                .ok()
                .and_then(|fmt| now.format(&fmt).ok())
                .unwrap_or_else(|| "unknown".to_string())
        })
    };

    let date = stamp("FONTPATCH_BUILD_DATE", "[year]-[month]-[day]");
    let time = stamp("FONTPATCH_BUILD_TIME", "[hour]:[minute]:[second]");

    println!("cargo:rerun-if-env-changed=FONTPATCH_BUILD_DATE");
    println!("cargo:rerun-if-env-changed=FONTPATCH_BUILD_TIME");
    println!("cargo:rustc-env=FONTPATCH_BUILD_DATE={date}");
    println!("cargo:rustc-env=FONTPATCH_BUILD_TIME={time}");
}
