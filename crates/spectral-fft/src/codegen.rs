// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — WGSL Kernel Codegen
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-configuration WGSL generation.
//!
//! Every transform pipeline is specialized at plan time: line addressing,
//! stage spans, radix roots and table offsets are baked into the source as
//! literals, so the kernels take no uniforms at all. One workgroup owns one
//! 1D line; the whole line lives in two workgroup-local ping-pong arrays
//! with a barrier between butterfly stages, one invocation per data point.

use std::fmt::Write;

use crate::radix::{unit_roots, StagePlan};

/// Workgroup width of the elementwise packing kernels.
pub const PACK_WORKGROUP: u32 = 256;

/// How one transform pipeline walks the grid: which line a workgroup owns
/// and how that line is laid out in the flat buffer.
#[derive(Debug, Clone)]
pub struct LineAddressing {
    pub label: String,
    /// WGSL expression for the line's base offset, in terms of `group_id`.
    pub base_expr: String,
    /// Element stride along the line.
    pub stride: usize,
    /// Workgroup grid (x, y); one workgroup per line.
    pub dispatch: (u32, u32),
}

fn wgsl_f32(value: f32) -> String {
    // Debug formatting round-trips f32 and always keeps a decimal point.
    format!("{value:?}")
}

/// Generate the complete transform shader for one (length, direction,
/// addressing) configuration.
pub fn transform_shader(plan: &StagePlan, addr: &LineAddressing) -> String {
    let n = plan.len;
    let direction = if plan.forward { "forward" } else { "inverse" };
    let radices: Vec<String> = plan.stages.iter().map(|s| s.radix.to_string()).collect();

    let mut source = String::new();
    let _ = writeln!(
        source,
        "// {}: {n}-point {direction} transform, radices [{}]",
        addr.label,
        radices.join(", ")
    );
    source.push_str(
        "@group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;\n\
         @group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;\n\
         @group(0) @binding(2) var<storage, read> twiddles: array<vec2<f32>>;\n\n",
    );
    let _ = writeln!(source, "var<workgroup> ping: array<vec2<f32>, {n}>;");
    let _ = writeln!(source, "var<workgroup> pong: array<vec2<f32>, {n}>;\n");
    source.push_str(
        "fn cmul(a: vec2<f32>, b: vec2<f32>) -> vec2<f32> {\n\
         \x20   return vec2<f32>(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);\n\
         }\n\n",
    );
    let _ = writeln!(source, "@compute @workgroup_size({n}, 1, 1)");
    source.push_str(
        "fn fft_line(@builtin(local_invocation_index) lane: u32,\n\
         \x20           @builtin(workgroup_id) group_id: vec3<u32>) {\n",
    );
    let _ = writeln!(source, "    let line = {};", addr.base_expr);
    let _ = writeln!(source, "    ping[lane] = src[line + lane * {}u];", addr.stride);
    source.push_str("    workgroupBarrier();\n");

    for (index, stage) in plan.stages.iter().enumerate() {
        let (input, output) = if index % 2 == 0 {
            ("ping", "pong")
        } else {
            ("pong", "ping")
        };
        let radix = stage.radix;
        let span = stage.span;
        let butterflies = n / radix;
        let roots = unit_roots(radix, plan.forward);

        let _ = writeln!(source, "    // stage {index}: radix {radix}, span {span}");
        let _ = writeln!(source, "    if (lane < {butterflies}u) {{");
        let _ = writeln!(source, "        let t = lane % {span}u;");
        let _ = writeln!(source, "        var v: array<vec2<f32>, {radix}>;");
        let _ = writeln!(source, "        v[0] = {input}[lane];");
        for q in 1..radix {
            let _ = writeln!(
                source,
                "        v[{q}] = cmul({input}[lane + {}u], twiddles[{}u + t * {}u]);",
                q * butterflies,
                stage.twiddle_offset + (q - 1),
                radix - 1
            );
        }
        let _ = writeln!(source, "        var w: array<vec2<f32>, {radix}>;");
        for (k, root) in roots.iter().enumerate() {
            let _ = writeln!(
                source,
                "        w[{k}] = vec2<f32>({}, {});",
                wgsl_f32(root.re),
                wgsl_f32(root.im)
            );
        }
        let _ = writeln!(
            source,
            "        let base = (lane / {span}u) * {}u + t;",
            span * radix
        );
        let _ = writeln!(
            source,
            "        for (var q: u32 = 0u; q < {radix}u; q = q + 1u) {{\n\
             \x20           var acc = v[0];\n\
             \x20           for (var p: u32 = 1u; p < {radix}u; p = p + 1u) {{\n\
             \x20               acc = acc + cmul(v[p], w[(q * p) % {radix}u]);\n\
             \x20           }}\n\
             \x20           {output}[base + q * {span}u] = acc;\n\
             \x20       }}"
        );
        source.push_str("    }\n    workgroupBarrier();\n");
    }

    let result = if plan.stages.len() % 2 == 0 {
        "ping"
    } else {
        "pong"
    };
    let _ = writeln!(
        source,
        "    dst[line + lane * {}u] = {result}[lane];\n}}",
        addr.stride
    );
    source
}

/// Interleave adjacent pairs of real z-rows into packed complex rows.
pub fn pack_forward_shader(xsize: usize, ysize: usize, zsize: usize) -> String {
    let pairs = ysize / 2;
    format!(
        "// pack forward: {xsize}x{ysize}x{zsize} real grid -> {xsize}x{pairs}x{zsize} packed\n\
         @group(0) @binding(0) var<storage, read> src: array<f32>;\n\
         @group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;\n\n\
         @compute @workgroup_size({PACK_WORKGROUP}, 1, 1)\n\
         fn pack_forward(@builtin(local_invocation_index) lane: u32,\n\
         \x20               @builtin(workgroup_id) group_id: vec3<u32>) {{\n\
         \x20   let row_a = (group_id.x * {ysize}u + 2u * group_id.y) * {zsize}u;\n\
         \x20   let row_b = row_a + {zsize}u;\n\
         \x20   let out_row = (group_id.x * {pairs}u + group_id.y) * {zsize}u;\n\
         \x20   for (var k: u32 = lane; k < {zsize}u; k = k + {PACK_WORKGROUP}u) {{\n\
         \x20       dst[out_row + k] = vec2<f32>(src[row_a + k], src[row_b + k]);\n\
         \x20   }}\n\
         }}\n"
    )
}

/// Separate transformed packed rows into per-row non-redundant halves
/// using Hermitian symmetry.
pub fn unpack_forward_shader(xsize: usize, ysize: usize, zsize: usize) -> String {
    let pairs = ysize / 2;
    let zh = zsize / 2 + 1;
    format!(
        "// unpack forward: {xsize}x{pairs}x{zsize} packed spectra -> {xsize}x{ysize}x{zh} half grid\n\
         @group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;\n\
         @group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;\n\n\
         @compute @workgroup_size({PACK_WORKGROUP}, 1, 1)\n\
         fn unpack_forward(@builtin(local_invocation_index) lane: u32,\n\
         \x20               @builtin(workgroup_id) group_id: vec3<u32>) {{\n\
         \x20   let in_row = (group_id.x * {pairs}u + group_id.y) * {zsize}u;\n\
         \x20   let out_a = (group_id.x * {ysize}u + 2u * group_id.y) * {zh}u;\n\
         \x20   let out_b = out_a + {zh}u;\n\
         \x20   for (var k: u32 = lane; k < {zh}u; k = k + {PACK_WORKGROUP}u) {{\n\
         \x20       let p = src[in_row + k];\n\
         \x20       let r = src[in_row + ({zsize}u - k) % {zsize}u];\n\
         \x20       let q = vec2<f32>(r.x, -r.y);\n\
         \x20       let sum = p + q;\n\
         \x20       let diff = p - q;\n\
         \x20       dst[out_a + k] = 0.5 * sum;\n\
         \x20       dst[out_b + k] = vec2<f32>(0.5 * diff.y, -0.5 * diff.x);\n\
         \x20   }}\n\
         }}\n"
    )
}

/// Rebuild full-length packed rows from stored halves via conjugate
/// symmetry, ahead of the inverse z transform.
pub fn fold_backward_shader(xsize: usize, ysize: usize, zsize: usize) -> String {
    let pairs = ysize / 2;
    let zh = zsize / 2 + 1;
    format!(
        "// fold backward: {xsize}x{ysize}x{zh} half grid -> {xsize}x{pairs}x{zsize} packed spectra\n\
         @group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;\n\
         @group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;\n\n\
         @compute @workgroup_size({PACK_WORKGROUP}, 1, 1)\n\
         fn fold_backward(@builtin(local_invocation_index) lane: u32,\n\
         \x20               @builtin(workgroup_id) group_id: vec3<u32>) {{\n\
         \x20   let in_a = (group_id.x * {ysize}u + 2u * group_id.y) * {zh}u;\n\
         \x20   let in_b = in_a + {zh}u;\n\
         \x20   let out_row = (group_id.x * {pairs}u + group_id.y) * {zsize}u;\n\
         \x20   for (var k: u32 = lane; k < {zsize}u; k = k + {PACK_WORKGROUP}u) {{\n\
         \x20       var a: vec2<f32>;\n\
         \x20       var b: vec2<f32>;\n\
         \x20       if (k < {zh}u) {{\n\
         \x20           a = src[in_a + k];\n\
         \x20           b = src[in_b + k];\n\
         \x20       }} else {{\n\
         \x20           let r_a = src[in_a + {zsize}u - k];\n\
         \x20           let r_b = src[in_b + {zsize}u - k];\n\
         \x20           a = vec2<f32>(r_a.x, -r_a.y);\n\
         \x20           b = vec2<f32>(r_b.x, -r_b.y);\n\
         \x20       }}\n\
         \x20       dst[out_row + k] = vec2<f32>(a.x - b.y, a.y + b.x);\n\
         \x20   }}\n\
         }}\n"
    )
}

/// De-interleave inverse-transformed packed rows into real z-rows.
pub fn unpack_backward_shader(xsize: usize, ysize: usize, zsize: usize) -> String {
    let pairs = ysize / 2;
    format!(
        "// unpack backward: {xsize}x{pairs}x{zsize} packed -> {xsize}x{ysize}x{zsize} real grid\n\
         @group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;\n\
         @group(0) @binding(1) var<storage, read_write> dst: array<f32>;\n\n\
         @compute @workgroup_size({PACK_WORKGROUP}, 1, 1)\n\
         fn unpack_backward(@builtin(local_invocation_index) lane: u32,\n\
         \x20               @builtin(workgroup_id) group_id: vec3<u32>) {{\n\
         \x20   let in_row = (group_id.x * {pairs}u + group_id.y) * {zsize}u;\n\
         \x20   let out_a = (group_id.x * {ysize}u + 2u * group_id.y) * {zsize}u;\n\
         \x20   let out_b = out_a + {zsize}u;\n\
         \x20   for (var k: u32 = lane; k < {zsize}u; k = k + {PACK_WORKGROUP}u) {{\n\
         \x20       let p = src[in_row + k];\n\
         \x20       dst[out_a + k] = p.x;\n\
         \x20       dst[out_b + k] = p.y;\n\
         \x20   }}\n\
         }}\n"
    )
}
