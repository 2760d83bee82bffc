//! Logistic-growth fixture modules.
//!
//! The modules are written in WAT and implement the export surface a real
//! compiled model provides: growable f64 vectors in linear memory, an options
//! block with a setter and getter per tunable, and a solver object that
//! integrates a two-state model with fixed-step forward Euler.
//!
//! Model (inputs `[r, k]`, initial state `y = 1, z = 0`, outputs `[y, z]`):
//!
//! ```text
//! dy/dt = r * y * (1 - y / k)
//! dz/dt = 2 * y - z          (Variant::SelfLimiting)
//! dz/dt = y * z - k * z      (Variant::CrossTerm)
//! ```
//!
//! Memory is handed out by a bump allocator that grows linear memory on
//! demand, so vector pushes and resizes really do move buffers.
//!
//! `Sundials_solve` writes `[y(t_i), z(t_i)]` for every time in the times
//! vector, resizing the outputs vector as needed. When the dinputs vector is
//! non-empty the doutputs vector receives a finite-difference directional
//! derivative. Exceeding `mxsteps` writes a diagnostic to stderr and returns
//! -1. Out-of-range `Vector_get`/`Vector_set` writes a diagnostic to stderr
//! and traps.

/// Step size of the fixture integrator (capped by the `max_step` option).
pub const STEP: f64 = 0.01;

/// Written to stderr when the step budget runs out.
pub const MXSTEPS_MESSAGE: &str = "mxsteps exceeded before reaching output time\n";

/// Written to stderr before trapping on a bad index.
pub const INDEX_MESSAGE: &str = "index out of range\n";

/// Written to stdout after a solve when `print_stats` is set.
pub const STATS_MESSAGE: &str = "solve complete\n";

/// Number of inputs, outputs and states of every fixture model.
pub const DIMENSION: usize = 2;

/// Which second-state equation the module integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// `dz/dt = 2y - z`
    SelfLimiting,
    /// `dz/dt = yz - kz`
    CrossTerm,
}

impl Variant {
    fn dzdt(self) -> &'static str {
        match self {
            Variant::SelfLimiting => {
                "(f64.sub (f64.mul (f64.const 2) (local.get $y)) (local.get $z))"
            }
            Variant::CrossTerm => {
                "(f64.sub (f64.mul (local.get $y) (local.get $z)) (f64.mul (local.get $k) (local.get $z)))"
            }
        }
    }
}

/// Options block layout: one 8-byte slot per tunable, in setter order.
const OPTION_FIELDS: [(&str, u32, &str, &str); 13] = [
    ("fixed_times", 0, "i32", "0"),
    ("print_stats", 8, "i32", "0"),
    ("fwd_sens", 16, "i32", "0"),
    ("atol", 24, "f64", "1e-6"),
    ("rtol", 32, "f64", "1e-6"),
    ("linear_solver", 40, "i32", "0"),
    ("preconditioner", 48, "i32", "0"),
    ("jacobian", 56, "i32", "0"),
    ("linsol_max_iterations", 64, "i32", "100"),
    ("debug", 72, "i32", "0"),
    ("mxsteps", 80, "i32", "500"),
    ("min_step", 88, "f64", "0"),
    ("max_step", 96, "f64", "0x1.fffffffffffffp+1023"),
];

const OPTIONS_SIZE: u32 = 104;

const MXSTEPS_AT: u32 = 64;
const STATS_AT: u32 = 128;
const INDEX_AT: u32 = 160;

const PRELUDE: &str = r#"
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (data (i32.const @MXSTEPS_AT@) "@MXSTEPS@")
  (data (i32.const @STATS_AT@) "@STATS@")
  (data (i32.const @INDEX_AT@) "@INDEX@")

  (func $write (param $fd i32) (param $ptr i32) (param $len i32)
    (i32.store (i32.const 0) (local.get $ptr))
    (i32.store (i32.const 4) (local.get $len))
    (drop (call $fd_write (local.get $fd) (i32.const 0) (i32.const 1) (i32.const 8))))

  (func $alloc (param $size i32) (result i32)
    (local $ptr i32) (local $end i32) (local $have i32)
    (local.set $ptr (i32.and (i32.add (global.get $heap) (i32.const 7)) (i32.const -8)))
    (local.set $end (i32.add (local.get $ptr) (local.get $size)))
    (local.set $have (i32.mul (memory.size) (i32.const 65536)))
    (if (i32.gt_u (local.get $end) (local.get $have))
      (then
        (if (i32.eq
              (memory.grow
                (i32.div_u
                  (i32.add (i32.sub (local.get $end) (local.get $have)) (i32.const 65535))
                  (i32.const 65536)))
              (i32.const -1))
          (then unreachable))))
    (global.set $heap (local.get $end))
    (local.get $ptr))
"#;

const VECTOR_EXPORTS: &str = r#"
  (func $vec_new (export "Vector_create_with_capacity") (param $len i32) (param $cap i32) (result i32)
    (local $v i32)
    (if (i32.lt_u (local.get $cap) (local.get $len))
      (then (local.set $cap (local.get $len))))
    (if (i32.eqz (local.get $cap))
      (then (local.set $cap (i32.const 1))))
    (local.set $v (call $alloc (i32.const 16)))
    (i32.store (local.get $v) (call $alloc (i32.shl (local.get $cap) (i32.const 3))))
    (i32.store offset=4 (local.get $v) (local.get $len))
    (i32.store offset=8 (local.get $v) (local.get $cap))
    (memory.fill (i32.load (local.get $v)) (i32.const 0) (i32.shl (local.get $cap) (i32.const 3)))
    (local.get $v))

  (func (export "Vector_create") (result i32)
    (call $vec_new (i32.const 0) (i32.const 0)))

  (func (export "Vector_destroy") (param $v i32))

  (func $vec_reserve (param $v i32) (param $need i32)
    (local $cap i32) (local $data i32)
    (local.set $cap (i32.load offset=8 (local.get $v)))
    (if (i32.gt_u (local.get $need) (local.get $cap))
      (then
        (local.set $cap (i32.shl (local.get $cap) (i32.const 1)))
        (if (i32.lt_u (local.get $cap) (local.get $need))
          (then (local.set $cap (local.get $need))))
        (local.set $data (call $alloc (i32.shl (local.get $cap) (i32.const 3))))
        (memory.fill (local.get $data) (i32.const 0) (i32.shl (local.get $cap) (i32.const 3)))
        (memory.copy
          (local.get $data)
          (i32.load (local.get $v))
          (i32.shl (i32.load offset=4 (local.get $v)) (i32.const 3)))
        (i32.store (local.get $v) (local.get $data))
        (i32.store offset=8 (local.get $v) (local.get $cap)))))

  (func $vec_push (export "Vector_push") (param $v i32) (param $x f64)
    (local $len i32)
    (local.set $len (i32.load offset=4 (local.get $v)))
    (call $vec_reserve (local.get $v) (i32.add (local.get $len) (i32.const 1)))
    (f64.store
      (i32.add (i32.load (local.get $v)) (i32.shl (local.get $len) (i32.const 3)))
      (local.get $x))
    (i32.store offset=4 (local.get $v) (i32.add (local.get $len) (i32.const 1))))

  (func $check_index (param $v i32) (param $i i32)
    (if (i32.ge_u (local.get $i) (i32.load offset=4 (local.get $v)))
      (then
        (call $write (i32.const 2) (i32.const @INDEX_AT@) (i32.const @INDEX_LEN@))
        unreachable)))

  (func $vec_get (export "Vector_get") (param $v i32) (param $i i32) (result f64)
    (call $check_index (local.get $v) (local.get $i))
    (f64.load (i32.add (i32.load (local.get $v)) (i32.shl (local.get $i) (i32.const 3)))))

  (func (export "Vector_set") (param $v i32) (param $i i32) (param $x f64)
    (call $check_index (local.get $v) (local.get $i))
    (f64.store
      (i32.add (i32.load (local.get $v)) (i32.shl (local.get $i) (i32.const 3)))
      (local.get $x)))

  (func $vec_resize (export "Vector_resize") (param $v i32) (param $n i32)
    (local $len i32)
    (local.set $len (i32.load offset=4 (local.get $v)))
    (call $vec_reserve (local.get $v) (local.get $n))
    (if (i32.gt_u (local.get $n) (local.get $len))
      (then
        (memory.fill
          (i32.add (i32.load (local.get $v)) (i32.shl (local.get $len) (i32.const 3)))
          (i32.const 0)
          (i32.shl (i32.sub (local.get $n) (local.get $len)) (i32.const 3)))))
    (i32.store offset=4 (local.get $v) (local.get $n)))

  (func $vec_data (export "Vector_get_data") (param $v i32) (result i32)
    (i32.load (local.get $v)))

  (func $vec_len (export "Vector_get_length") (param $v i32) (result i32)
    (i32.load offset=4 (local.get $v)))

  (func (export "Vector_linspace_create") (param $start f64) (param $stop f64) (param $n i32) (result i32)
    (local $v i32) (local $i i32) (local $step f64)
    (local.set $v (call $vec_new (local.get $n) (local.get $n)))
    (if (i32.gt_u (local.get $n) (i32.const 1))
      (then
        (local.set $step
          (f64.div
            (f64.sub (local.get $stop) (local.get $start))
            (f64.convert_i32_u (i32.sub (local.get $n) (i32.const 1)))))))
    (block $done
      (loop $fill
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (f64.store
          (i32.add (i32.load (local.get $v)) (i32.shl (local.get $i) (i32.const 3)))
          (f64.add (local.get $start) (f64.mul (local.get $step) (f64.convert_i32_u (local.get $i)))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $fill)))
    (local.get $v))
"#;

const SOLVER_EXPORTS: &str = r#"
  (func (export "Sundials_create") (result i32)
    (call $alloc (i32.const 8)))

  (func (export "Sundials_destroy") (param $s i32))

  (func (export "Sundials_init") (param $s i32) (param $o i32)
    (i32.store (local.get $s) (local.get $o)))

  (func (export "Sundials_number_of_states") (param $s i32) (result i32)
    (i32.const @DIMENSION@))

  (func (export "Sundials_number_of_inputs") (param $s i32) (result i32)
    (i32.const @DIMENSION@))

  (func (export "Sundials_number_of_outputs") (param $s i32) (result i32)
    (i32.const @DIMENSION@))

  (func $integrate (param $s i32) (param $times i32) (param $r f64) (param $k f64) (param $out i32) (result i32)
    (local $o i32) (local $n i32) (local $i i32) (local $steps i32) (local $mxsteps i32)
    (local $t f64) (local $target f64) (local $h f64) (local $dt f64)
    (local $y f64) (local $z f64) (local $dy f64) (local $dz f64)
    (local.set $o (i32.load (local.get $s)))
    (local.set $mxsteps (i32.load offset=80 (local.get $o)))
    (local.set $h (f64.min (f64.const @STEP@) (f64.load offset=96 (local.get $o))))
    (local.set $n (call $vec_len (local.get $times)))
    (local.set $t (call $vec_get (local.get $times) (i32.const 0)))
    (local.set $y (f64.const 1))
    (local.set $z (f64.const 0))
    (block $done
      (loop $each_time
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (local.set $target (call $vec_get (local.get $times) (local.get $i)))
        (block $reached
          (loop $step
            (br_if $reached
              (f64.le (f64.sub (local.get $target) (local.get $t)) (f64.const 1e-12)))
            (local.set $steps (i32.add (local.get $steps) (i32.const 1)))
            (if (i32.gt_s (local.get $steps) (local.get $mxsteps))
              (then
                (call $write (i32.const 2) (i32.const @MXSTEPS_AT@) (i32.const @MXSTEPS_LEN@))
                (return (i32.const -1))))
            (local.set $dt (f64.min (local.get $h) (f64.sub (local.get $target) (local.get $t))))
            (local.set $dy
              (f64.mul
                (f64.mul (local.get $r) (local.get $y))
                (f64.sub (f64.const 1) (f64.div (local.get $y) (local.get $k)))))
            (local.set $dz @DZDT@)
            (local.set $y (f64.add (local.get $y) (f64.mul (local.get $dt) (local.get $dy))))
            (local.set $z (f64.add (local.get $z) (f64.mul (local.get $dt) (local.get $dz))))
            (local.set $t (f64.add (local.get $t) (local.get $dt)))
            (br $step)))
        (f64.store
          (i32.add (local.get $out) (i32.shl (local.get $i) (i32.const 4)))
          (local.get $y))
        (f64.store offset=8
          (i32.add (local.get $out) (i32.shl (local.get $i) (i32.const 4)))
          (local.get $z))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $each_time)))
    (i32.const 0))

  (func $report_stats (param $s i32)
    (if (i32.load offset=8 (i32.load (local.get $s)))
      (then (call $write (i32.const 1) (i32.const @STATS_AT@) (i32.const @STATS_LEN@)))))

  (func (export "Sundials_solve")
    (param $s i32) (param $times i32) (param $inputs i32)
    (param $dinputs i32) (param $outputs i32) (param $doutputs i32)
    (result i32)
    (local $m i32) (local $r f64) (local $k f64) (local $status i32)
    (local $scratch i32) (local $base i32) (local $dst i32) (local $i i32)
    (local.set $m (i32.shl (call $vec_len (local.get $times)) (i32.const 1)))
    (call $vec_resize (local.get $outputs) (local.get $m))
    (local.set $r (call $vec_get (local.get $inputs) (i32.const 0)))
    (local.set $k (call $vec_get (local.get $inputs) (i32.const 1)))
    (local.set $status
      (call $integrate
        (local.get $s) (local.get $times) (local.get $r) (local.get $k)
        (call $vec_data (local.get $outputs))))
    (if (local.get $status)
      (then (return (local.get $status))))
    (if (i32.eqz (call $vec_len (local.get $dinputs)))
      (then
        (call $report_stats (local.get $s))
        (return (i32.const 0))))
    (call $vec_resize (local.get $doutputs) (local.get $m))
    (local.set $scratch (call $alloc (i32.shl (local.get $m) (i32.const 3))))
    (local.set $status
      (call $integrate
        (local.get $s) (local.get $times)
        (f64.add (local.get $r)
          (f64.mul (f64.const 1e-7) (call $vec_get (local.get $dinputs) (i32.const 0))))
        (f64.add (local.get $k)
          (f64.mul (f64.const 1e-7) (call $vec_get (local.get $dinputs) (i32.const 1))))
        (local.get $scratch)))
    (if (local.get $status)
      (then (return (local.get $status))))
    (local.set $base (call $vec_data (local.get $outputs)))
    (local.set $dst (call $vec_data (local.get $doutputs)))
    (block $done
      (loop $diff
        (br_if $done (i32.ge_u (local.get $i) (local.get $m)))
        (f64.store
          (i32.add (local.get $dst) (i32.shl (local.get $i) (i32.const 3)))
          (f64.div
            (f64.sub
              (f64.load (i32.add (local.get $scratch) (i32.shl (local.get $i) (i32.const 3))))
              (f64.load (i32.add (local.get $base) (i32.shl (local.get $i) (i32.const 3)))))
            (f64.const 1e-7)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $diff)))
    (call $report_stats (local.get $s))
    (i32.const 0))
"#;

fn options_exports(with_getters: bool) -> String {
    let mut wat = String::new();

    wat.push_str(&format!(
        "\n  (func (export \"Options_create\") (result i32)\n    (local $o i32)\n    (local.set $o (call $alloc (i32.const {OPTIONS_SIZE})))\n"
    ));
    for (_, offset, ty, default) in OPTION_FIELDS {
        wat.push_str(&format!(
            "    ({ty}.store offset={offset} (local.get $o) ({ty}.const {default}))\n"
        ));
    }
    wat.push_str("    (local.get $o))\n");

    wat.push_str("\n  (func (export \"Options_destroy\") (param $o i32))\n");

    for (name, offset, ty, _) in OPTION_FIELDS {
        wat.push_str(&format!(
            "\n  (func (export \"Options_set_{name}\") (param $o i32) (param $x {ty})\n    ({ty}.store offset={offset} (local.get $o) (local.get $x)))\n"
        ));
        if with_getters {
            wat.push_str(&format!(
                "\n  (func (export \"Options_get_{name}\") (param $o i32) (result {ty})\n    ({ty}.load offset={offset} (local.get $o)))\n"
            ));
        }
    }

    wat
}

fn escape(message: &str) -> String {
    message.replace('\n', "\\n")
}

fn fill(template: &str, dzdt: &str) -> String {
    template
        .replace("@MXSTEPS_AT@", &MXSTEPS_AT.to_string())
        .replace("@STATS_AT@", &STATS_AT.to_string())
        .replace("@INDEX_AT@", &INDEX_AT.to_string())
        .replace("@MXSTEPS@", &escape(MXSTEPS_MESSAGE))
        .replace("@STATS@", &escape(STATS_MESSAGE))
        .replace("@INDEX@", &escape(INDEX_MESSAGE))
        .replace("@MXSTEPS_LEN@", &MXSTEPS_MESSAGE.len().to_string())
        .replace("@STATS_LEN@", &STATS_MESSAGE.len().to_string())
        .replace("@INDEX_LEN@", &INDEX_MESSAGE.len().to_string())
        .replace("@DIMENSION@", &DIMENSION.to_string())
        .replace("@STEP@", &format!("{STEP:?}"))
        .replace("@DZDT@", dzdt)
}

/// Returns the WAT source of a complete model module.
pub fn logistic_wat(variant: Variant) -> String {
    let mut wat = String::from("(module");
    wat.push_str(PRELUDE);
    wat.push_str(VECTOR_EXPORTS);
    wat.push_str(&options_exports(true));
    wat.push_str(SOLVER_EXPORTS);
    wat.push(')');
    fill(&wat, variant.dzdt())
}

/// Compiles a complete model module.
///
/// # Panics
///
/// Panics if the fixture WAT fails to assemble.
pub fn logistic_module(variant: Variant) -> Vec<u8> {
    wat::parse_str(logistic_wat(variant))
        .unwrap_or_else(|e| panic!("fixture module failed to assemble: {e}"))
}

/// Compiles a module that only provides vector operations and memory.
///
/// Options and solver exports are absent, as in a module built without them.
pub fn vector_only_module() -> Vec<u8> {
    let mut wat = String::from("(module");
    wat.push_str(PRELUDE);
    wat.push_str(VECTOR_EXPORTS);
    wat.push(')');
    wat::parse_str(fill(&wat, ""))
        .unwrap_or_else(|e| panic!("fixture module failed to assemble: {e}"))
}

/// Compiles a module whose options block has setters but no getters.
pub fn setter_only_module(variant: Variant) -> Vec<u8> {
    let mut wat = String::from("(module");
    wat.push_str(PRELUDE);
    wat.push_str(VECTOR_EXPORTS);
    wat.push_str(&options_exports(false));
    wat.push_str(SOLVER_EXPORTS);
    wat.push(')');
    wat::parse_str(fill(&wat, variant.dzdt()))
        .unwrap_or_else(|e| panic!("fixture module failed to assemble: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modules_assemble() {
        assert!(!logistic_module(Variant::SelfLimiting).is_empty());
        assert!(!logistic_module(Variant::CrossTerm).is_empty());
        assert!(!vector_only_module().is_empty());
        assert!(!setter_only_module(Variant::SelfLimiting).is_empty());
    }

    #[test]
    fn test_variants_differ() {
        assert_ne!(
            logistic_wat(Variant::SelfLimiting),
            logistic_wat(Variant::CrossTerm)
        );
    }

    #[test]
    fn test_placeholders_filled() {
        assert!(!logistic_wat(Variant::CrossTerm).contains('@'));
    }

    #[test]
    fn test_wasm_magic() {
        let binary = logistic_module(Variant::SelfLimiting);
        assert_eq!(&binary[..4], b"\0asm");
    }
}
