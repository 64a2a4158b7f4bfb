pub mod comment;
pub mod compensation;
pub mod lifecycle;
pub mod tag;
pub mod video;

pub use comment::{Comment, CommentId, NewComment};
pub use compensation::{CompensationReport, FailedDeletion};
pub use lifecycle::{
    CreateVideoRequest, CreatedVideo, DeletedVideo, UpdateVideoRequest, UpdatedVideo,
};
pub use tag::{Tag, TagId};
pub use video::{BlobRefs, NewVideoRow, Video, VideoDetails, VideoId, VideoRowUpdate};
