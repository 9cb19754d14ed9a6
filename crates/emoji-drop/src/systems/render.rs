use crate::assets::glyph_cache::Glyph;
use crate::components::particle::Particle;
use crate::core::pool::ParticlePool;
use crate::renderer::instance::{DrawBuffer, DrawInstance, DrawKind};
use crate::systems::depth::DepthSorter;
use crate::systems::effects::{Spark, SparkField};

/// Sparks are drawn with the settled glyph at this fraction of full size.
const SPARK_SCALE: f32 = 0.3;

/// Anything that can appear on stage.
#[derive(Debug, Clone, Copy)]
pub enum StageEntity<'a> {
    Emoji(&'a Particle),
    Spark { spark: &'a Spark, glyph: &'a Glyph },
}

impl StageEntity<'_> {
    pub fn kind(&self) -> DrawKind {
        match self {
            StageEntity::Emoji(_) => DrawKind::Emoji,
            StageEntity::Spark { .. } => DrawKind::Spark,
        }
    }

    pub fn to_instance(&self) -> DrawInstance {
        match *self {
            StageEntity::Emoji(p) => DrawInstance {
                x: p.pos.x,
                y: p.pos.y,
                rotation: p.rotation,
                scale_x: p.scale.x,
                scale_y: p.scale.y,
                glyph_col: p.glyph.cell.col as f32,
                glyph_row: p.glyph.cell.row as f32,
                glyph_id: p.glyph.id.0 as f32,
                kind: self.kind().as_f32(),
                alpha: 1.0,
                order: 0.0,
                depth: p.depth().map_or(-1.0, |d| d.0),
            },
            StageEntity::Spark { spark, glyph } => {
                let alpha = spark.alpha();
                let scale = SPARK_SCALE * alpha;
                DrawInstance {
                    x: spark.pos.x,
                    y: spark.pos.y,
                    rotation: 0.0,
                    scale_x: scale,
                    scale_y: scale,
                    glyph_col: glyph.cell.col as f32,
                    glyph_row: glyph.cell.row as f32,
                    glyph_id: glyph.id.0 as f32,
                    kind: self.kind().as_f32(),
                    alpha,
                    order: 0.0,
                    depth: -1.0,
                }
            }
        }
    }
}

/// Rebuild the draw buffer in painter's order:
/// the pile back to front, then airborne particles oldest first, then sparks.
pub fn build_draw_buffer(
    pool: &ParticlePool,
    depth: &DepthSorter,
    sparks: &SparkField,
    spark_glyph: &Glyph,
    buffer: &mut DrawBuffer,
) {
    buffer.clear();

    for (_, id) in depth.order() {
        if let Some(p) = pool.get(*id) {
            buffer.push(StageEntity::Emoji(p).to_instance());
        }
    }
    buffer.mark_pile_end();

    for p in pool.iter().filter(|p| p.lifecycle.is_airborne()) {
        buffer.push(StageEntity::Emoji(p).to_instance());
    }
    buffer.mark_flight_end();

    for spark in sparks.iter() {
        buffer.push(
            StageEntity::Spark {
                spark,
                glyph: spark_glyph,
            }
            .to_instance(),
        );
    }
}
