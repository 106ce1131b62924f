//! Fixed sample posts served for identifiers that are not database ids.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct DemoPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image: String,
}

/// In-memory, read-only set of demo posts, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct DemoCatalog {
    posts: Vec<DemoPost>,
}

impl DemoCatalog {
    pub fn new(posts: Vec<DemoPost>) -> Self {
        DemoCatalog { posts }
    }

    pub fn find(&self, key: &str) -> Option<&DemoPost> {
        self.posts.iter().find(|post| post.id == key)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// The sample posts shipped with the service.
    pub fn builtin() -> Self {
        let entries = [
            (
                "1",
                "Mastering React Hooks",
                "Hooks let function components hold state and run side effects without classes.\n\n\
                 The ones you reach for most often:\n\
                 1. useState keeps local state.\n\
                 2. useEffect runs side effects such as data fetching.\n\
                 3. useContext reads a value from context.\n\
                 4. useRef holds a mutable reference across renders.",
                "Learn how to use React Hooks effectively to build dynamic applications...",
                "https://images.unsplash.com/photo-1536859355448-76f92ebdc33d?q=80&w=2069&auto=format&fit=crop",
            ),
            (
                "2",
                "Understanding Node.js Middleware",
                "Middleware functions sit between the incoming request and the final handler. \
                 Each one can inspect or modify the request, end the response early, or pass control on.",
                "A deep dive into middleware functions and how they enhance Express.js applications...",
                "https://miro.medium.com/v2/resize:fit:1000/0*55IwzpvP6yQfxFs-.png",
            ),
            (
                "3",
                "JWT Authentication in MERN Stack",
                "A JSON Web Token carries signed claims about the caller. The server issues one at login \
                 and checks its signature and expiry on every protected request.",
                "Secure your applications with JWT authentication. Step-by-step implementation...",
                "https://blog.logrocket.com/wp-content/uploads/2021/06/jwt-authentication-best-practices.png",
            ),
            (
                "4",
                "Building RESTful APIs with Express",
                "Resources get stable URLs and HTTP methods express intent: GET reads, POST creates, \
                 DELETE removes. Status codes tell the client what happened.",
                "Learn how to create RESTful APIs using Express.js and Node.js...",
                "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcSTH7ZuWbQtQ33tRnTRfJGHUGTnMV0e2KxV9g&s",
            ),
            (
                "5",
                "Exploring GraphQL: A New Way to Query APIs",
                "GraphQL lets the client describe exactly the shape of data it needs in a single request, \
                 backed by a typed schema on the server.",
                "Discover how GraphQL can simplify data fetching in your applications...",
                "https://graphql.com/graphql-dot-com.jpg",
            ),
            (
                "6",
                "Deploying Your MERN Stack Application",
                "Build the frontend, configure environment variables for the API, point it at a managed \
                 database and put both behind HTTPS.",
                "A step-by-step guide to deploying your MERN stack application to production...",
                "https://clickysoft.com/wp-content/uploads/2023/11/Benefits-of-MERN-Stack-Developers.jpg",
            ),
        ];

        DemoCatalog::new(
            entries
                .into_iter()
                .map(|(id, title, content, excerpt, image)| DemoPost {
                    id: id.to_string(),
                    title: title.to_string(),
                    content: content.to_string(),
                    excerpt: excerpt.to_string(),
                    image: image.to_string(),
                })
                .collect(),
        )
    }
}
