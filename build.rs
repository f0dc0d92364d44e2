// 静态链接 FFmpeg (vcpkg) 时 MSVC 需要额外的系统库
const MSVC_FFMPEG_LIBS: [&str; 5] = ["libmfx", "libx264", "oleaut32", "vfw32", "secur32"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    if target_os == "windows" && target_env == "msvc" {
        for lib in MSVC_FFMPEG_LIBS {
            println!("cargo:rustc-link-lib=dylib={}", lib);
        }
    }
}
