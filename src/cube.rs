// cube.rs — 预览立方体的几何：六个渐变面板
//
// 坐标系沿用 CSS：x 向右，y 向下，z 指向观察者。单位是逻辑像素。

use glam::{Mat4, Vec3};

use crate::rotation::Orientation;

/// Panel edge length (w-64 / h-64).
pub const FACE_SIZE: f32 = 256.0;
/// Offset of every panel along its own normal (translateZ(32px)).
pub const FACE_DEPTH: f32 = 32.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Turn {
    None,
    Y(f32),
    X(f32),
}

impl Turn {
    fn matrix(self) -> Mat4 {
        match self {
            Turn::None => Mat4::IDENTITY,
            Turn::Y(deg) => Mat4::from_rotation_y(deg.to_radians()),
            Turn::X(deg) => Mat4::from_rotation_x(deg.to_radians()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceStyle {
    turn: Turn,
    from: u32,
    to: u32,
    opacity: f32,
}

// tailwind 色板：cyan-200..600 / blue-300..700
const FACES: [FaceStyle; 6] = [
    FaceStyle {
        turn: Turn::None,
        from: 0x22d3ee,
        to: 0x3b82f6,
        opacity: 1.0,
    },
    FaceStyle {
        turn: Turn::Y(90.0),
        from: 0x06b6d4,
        to: 0x2563eb,
        opacity: 0.8,
    },
    FaceStyle {
        turn: Turn::Y(180.0),
        from: 0x67e8f9,
        to: 0x60a5fa,
        opacity: 0.6,
    },
    FaceStyle {
        turn: Turn::Y(-90.0),
        from: 0x06b6d4,
        to: 0x2563eb,
        opacity: 0.8,
    },
    FaceStyle {
        turn: Turn::X(90.0),
        from: 0xa5f3fc,
        to: 0x93c5fd,
        opacity: 0.5,
    },
    FaceStyle {
        turn: Turn::X(-90.0),
        from: 0x0891b2,
        to: 0x1d4ed8,
        opacity: 0.7,
    },
];

pub const FACE_COUNT: usize = FACES.len();
pub const INDICES_PER_FACE: u32 = 6;

#[derive(Debug, Clone)]
pub struct CubeMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    /// Panel centres before rotation, used for depth sorting.
    pub centers: [Vec3; FACE_COUNT],
}

pub fn build_cube() -> CubeMesh {
    let half = FACE_SIZE / 2.0;
    // 左上、右上、右下、左下（y 向下）
    let corners = [
        Vec3::new(-half, -half, FACE_DEPTH),
        Vec3::new(half, -half, FACE_DEPTH),
        Vec3::new(half, half, FACE_DEPTH),
        Vec3::new(-half, half, FACE_DEPTH),
    ];

    let mut vertices = Vec::with_capacity(FACE_COUNT * 4);
    let mut indices = Vec::with_capacity(FACE_COUNT * INDICES_PER_FACE as usize);
    let mut centers = [Vec3::ZERO; FACE_COUNT];

    for (i, face) in FACES.iter().enumerate() {
        let m = face.turn.matrix();
        let from = srgb_hex_to_linear(face.from);
        let to = srgb_hex_to_linear(face.to);
        let mid = [
            (from[0] + to[0]) / 2.0,
            (from[1] + to[1]) / 2.0,
            (from[2] + to[2]) / 2.0,
        ];
        // to-br 渐变：左上 from，右下 to，其余两角取中间色
        let colors = [from, mid, to, mid];

        let base = vertices.len() as u16;
        for (corner, rgb) in corners.iter().zip(colors) {
            let p = m.transform_point3(*corner);
            vertices.push(Vertex {
                position: p.to_array(),
                color: [rgb[0], rgb[1], rgb[2], face.opacity],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        centers[i] = m.transform_point3(Vec3::new(0.0, 0.0, FACE_DEPTH));
    }

    CubeMesh {
        vertices,
        indices,
        centers,
    }
}

/// `rotateX(pitch) rotateY(yaw)` as CSS composes it.
pub fn rotation_matrix(o: Orientation) -> Mat4 {
    Mat4::from_rotation_x(o.pitch.to_radians()) * Mat4::from_rotation_y(o.yaw.to_radians())
}

/// Face indices ordered back to front (smallest z first) under `model`.
pub fn draw_order(mesh: &CubeMesh, model: Mat4) -> [usize; FACE_COUNT] {
    let mut order: [usize; FACE_COUNT] = std::array::from_fn(|i| i);
    let depth = |i: usize| model.transform_point3(mesh.centers[i]).z;
    order.sort_by(|&a, &b| depth(a).total_cmp(&depth(b)));
    order
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn srgb_hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn six_panels_offset_along_their_normals() {
        let mesh = build_cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        let expected = [
            Vec3::new(0.0, 0.0, FACE_DEPTH),
            Vec3::new(FACE_DEPTH, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -FACE_DEPTH),
            Vec3::new(-FACE_DEPTH, 0.0, 0.0),
            Vec3::new(0.0, -FACE_DEPTH, 0.0),
            Vec3::new(0.0, FACE_DEPTH, 0.0),
        ];
        for (c, e) in mesh.centers.iter().zip(expected) {
            assert!(approx(*c, e), "{c:?} != {e:?}");
        }
    }

    #[test]
    fn front_panel_gradient_and_opacity() {
        let mesh = build_cube();
        let front = &mesh.vertices[0..4];
        assert_eq!(front[0].position, [-128.0, -128.0, FACE_DEPTH]);
        assert_eq!(&front[0].color[..3], &srgb_hex_to_linear(0x22d3ee)[..]);
        assert_eq!(&front[2].color[..3], &srgb_hex_to_linear(0x3b82f6)[..]);
        assert!(front.iter().all(|v| v.color[3] == 1.0));
        assert!(mesh.vertices[8..12].iter().all(|v| v.color[3] == 0.6));
    }

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(srgb_hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
        let white = srgb_hex_to_linear(0xffffff);
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
        let grey = srgb_hex_to_linear(0x808080)[0];
        assert!((grey - 0.2158).abs() < 1e-3);
    }

    #[test]
    fn positive_yaw_turns_front_to_the_right() {
        let m = rotation_matrix(Orientation::new(0.0, 90.0));
        let p = m.transform_point3(Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(p, Vec3::new(1.0, 0.0, 0.0)), "{p:?}");
    }

    #[test]
    fn positive_pitch_tips_front_upward() {
        // CSS rotateX(+90)：正面转向 -y（屏幕上方）
        let m = rotation_matrix(Orientation::new(90.0, 0.0));
        let p = m.transform_point3(Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(p, Vec3::new(0.0, -1.0, 0.0)), "{p:?}");
    }

    #[test]
    fn draw_order_puts_facing_panel_last() {
        let mesh = build_cube();
        let order = draw_order(&mesh, rotation_matrix(Orientation::ZERO));
        assert_eq!(order[FACE_COUNT - 1], 0);
        assert_eq!(order[0], 2);

        let turned = draw_order(&mesh, rotation_matrix(Orientation::new(0.0, 90.0)));
        // 右侧面板转到背面，左侧面板转到正面
        assert_eq!(turned[FACE_COUNT - 1], 3);
        assert_eq!(turned[0], 1);
    }
}
