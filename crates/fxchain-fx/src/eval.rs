//! Per-pixel evaluation of compiled programs.

use crate::ast::Op;

/// A runtime value: a scalar or an RGBA color in unit range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f32),
    Color([f32; 4]),
}

impl Value {
    /// Scalar view; colors collapse to their luminance.
    pub fn scalar(self) -> f32 {
        match self {
            Value::Scalar(s) => s,
            Value::Color(c) => luma(c),
        }
    }

    /// Color view; scalars become opaque gray.
    pub fn color(self) -> [f32; 4] {
        match self {
            Value::Scalar(s) => [s, s, s, 1.0],
            Value::Color(c) => c,
        }
    }

    /// Apply `f` to rgb (scalars directly), preserving alpha.
    fn map_rgb(self, f: impl Fn(f32) -> f32) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(f(s)),
            Value::Color([r, g, b, a]) => Value::Color([f(r), f(g), f(b), a]),
        }
    }
}

/// Inputs visible to a program at one pixel.
#[derive(Debug, Clone, Copy)]
pub struct PixelEnv {
    pub source: [f32; 4],
    pub u: f32,
    pub v: f32,
    pub time: f32,
    pub frame: f32,
}

pub(crate) fn luma(c: [f32; 4]) -> f32 {
    let w = fxchain_core::color::LUMA_WEIGHTS;
    c[0] * w[0] + c[1] * w[1] + c[2] * w[2]
}

/// Arithmetic with broadcasting. Color/color works per channel including
/// alpha; scalar/color applies to rgb and keeps the color's alpha.
pub(crate) fn binary(op: Op, a: Value, b: Value) -> Value {
    let f = |x: f32, y: f32| match op {
        Op::Add => x + y,
        Op::Sub => x - y,
        Op::Mul => x * y,
        Op::Div => x / y,
    };
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(f(x, y)),
        (Value::Color(x), Value::Color(y)) => {
            Value::Color([f(x[0], y[0]), f(x[1], y[1]), f(x[2], y[2]), f(x[3], y[3])])
        }
        (Value::Color(_), Value::Scalar(y)) => a.map_rgb(|x| f(x, y)),
        (Value::Scalar(x), Value::Color(_)) => b.map_rgb(|y| f(x, y)),
    }
}

fn mix(a: Value, b: Value, t: f32) -> Value {
    let lerp = |x: f32, y: f32| x + (y - x) * t;
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(lerp(x, y)),
        _ => {
            let (x, y) = (a.color(), b.color());
            Value::Color([
                lerp(x[0], y[0]),
                lerp(x[1], y[1]),
                lerp(x[2], y[2]),
                lerp(x[3], y[3]),
            ])
        }
    }
}

fn smoothstep(lo: f32, hi: f32, x: f32) -> f32 {
    if hi == lo {
        return if x < lo { 0.0 } else { 1.0 };
    }
    let t = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Built-in functions callable from programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Source,
    UvX,
    UvY,
    Color,
    Luma,
    Invert,
    Grayscale,
    Brightness,
    Tint,
    Blend,
    Mask,
    Step,
    Noise,
    Sin,
    Cos,
    Abs,
    Min,
    Max,
    Clamp,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        Some(match name {
            "source" => Builtin::Source,
            "uv_x" => Builtin::UvX,
            "uv_y" => Builtin::UvY,
            "color" => Builtin::Color,
            "luma" => Builtin::Luma,
            "invert" => Builtin::Invert,
            "grayscale" => Builtin::Grayscale,
            "brightness" => Builtin::Brightness,
            "tint" => Builtin::Tint,
            "blend" | "mix" => Builtin::Blend,
            "mask" => Builtin::Mask,
            "step" => Builtin::Step,
            "noise" => Builtin::Noise,
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "clamp" => Builtin::Clamp,
            _ => return None,
        })
    }

    /// Accepted argument counts, inclusive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Source | Builtin::UvX | Builtin::UvY => (0, 0),
            Builtin::Color | Builtin::Luma | Builtin::Sin | Builtin::Cos | Builtin::Abs => (1, 1),
            Builtin::Invert | Builtin::Grayscale => (1, 2),
            Builtin::Brightness | Builtin::Tint | Builtin::Step | Builtin::Min | Builtin::Max => {
                (2, 2)
            }
            Builtin::Noise => (0, 2),
            Builtin::Blend | Builtin::Mask | Builtin::Clamp => (3, 3),
        }
    }

    /// Whether the result can change between frames with identical input.
    pub fn reads_time(self) -> bool {
        matches!(self, Builtin::Noise)
    }

    pub(crate) fn call(self, args: &[Value], env: &PixelEnv) -> Value {
        let arg = |i: usize| args.get(i).copied().unwrap_or(Value::Scalar(1.0));
        match self {
            Builtin::Source => Value::Color(env.source),
            Builtin::UvX => Value::Scalar(env.u),
            Builtin::UvY => Value::Scalar(env.v),
            Builtin::Color => Value::Color(arg(0).color()),
            Builtin::Luma => Value::Scalar(arg(0).scalar()),
            Builtin::Invert => {
                let c = arg(0);
                mix(c, c.map_rgb(|x| 1.0 - x), arg(1).scalar())
            }
            Builtin::Grayscale => {
                let c = arg(0);
                let y = c.scalar();
                mix(c, c.map_rgb(|_| y), arg(1).scalar())
            }
            Builtin::Brightness => {
                let k = arg(1).scalar();
                arg(0).map_rgb(|x| x * k)
            }
            Builtin::Tint => binary(Op::Mul, arg(0), arg(1)),
            Builtin::Blend => mix(arg(0), arg(1), arg(2).scalar()),
            Builtin::Mask => {
                let (lo, hi) = (arg(1).scalar(), arg(2).scalar());
                arg(0).map_rgb(|x| smoothstep(lo, hi, x))
            }
            Builtin::Step => {
                let edge = arg(0).scalar();
                arg(1).map_rgb(|x| if x < edge { 0.0 } else { 1.0 })
            }
            Builtin::Noise => {
                let scale = args.first().map_or(1.0, |v| v.scalar());
                let speed = args.get(1).map_or(1.0, |v| v.scalar());
                Value::Scalar(fbm(env.u * scale, env.v * scale + env.time * speed))
            }
            Builtin::Sin => arg(0).map_rgb(f32::sin),
            Builtin::Cos => arg(0).map_rgb(f32::cos),
            Builtin::Abs => arg(0).map_rgb(f32::abs),
            Builtin::Min => {
                let b = arg(1).scalar();
                arg(0).map_rgb(|x| x.min(b))
            }
            Builtin::Max => {
                let b = arg(1).scalar();
                arg(0).map_rgb(|x| x.max(b))
            }
            Builtin::Clamp => {
                let (lo, hi) = (arg(1).scalar(), arg(2).scalar());
                arg(0).map_rgb(|x| x.max(lo).min(hi))
            }
        }
    }
}

fn hash2(x: i32, y: i32) -> f32 {
    let mut h = (x as u32).wrapping_mul(374_761_393) ^ (y as u32).wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    (h & 0x00ff_ffff) as f32 / 0x00ff_ffff as f32
}

/// Lattice coordinates repeat with this period.
const LATTICE_PERIOD: f32 = 65_536.0;

fn value_noise(x: f32, y: f32) -> f32 {
    let x = if x.is_finite() { x } else { 0.0 };
    let y = if y.is_finite() { y } else { 0.0 };
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let ix = x0.rem_euclid(LATTICE_PERIOD) as i32;
    let iy = y0.rem_euclid(LATTICE_PERIOD) as i32;
    let (ix1, iy1) = (ix.wrapping_add(1), iy.wrapping_add(1));
    let sx = fx * fx * (3.0 - 2.0 * fx);
    let sy = fy * fy * (3.0 - 2.0 * fy);
    let top = hash2(ix, iy) + (hash2(ix1, iy) - hash2(ix, iy)) * sx;
    let bottom = hash2(ix, iy1) + (hash2(ix1, iy1) - hash2(ix, iy1)) * sx;
    top + (bottom - top) * sy
}

/// Five-octave fractal value noise in [0, 1].
fn fbm(x: f32, y: f32) -> f32 {
    let (mut value, mut amplitude, mut norm) = (0.0, 0.5, 0.0);
    let (mut px, mut py) = (x, y);
    for _ in 0..5 {
        value += amplitude * value_noise(px, py);
        norm += amplitude;
        px *= 2.0;
        py *= 2.0;
        amplitude *= 0.5;
    }
    value / norm
}
