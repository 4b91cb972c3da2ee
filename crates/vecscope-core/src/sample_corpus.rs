//! Built-in demo corpus: five short documents on unrelated topics so that
//! clusters are obvious in the rendered point cloud.

pub const SAMPLE_DOCUMENTS: &[(&str, &str)] = &[
    (
        "Machine Learning Basics",
        "Machine learning is a subset of artificial intelligence that focuses on building systems \
         that can learn from and make decisions based on data. Supervised learning uses labeled \
         data to train models, while unsupervised learning finds patterns in unlabeled data. \
         Clustering algorithms such as k-means group similar data points without labels. \
         Deep learning uses neural networks with multiple layers to extract high-level features \
         from raw data. Common algorithms include decision trees, support vector machines, and \
         gradient boosting. Model evaluation uses metrics like accuracy, precision, recall, and F1 score. \
         Cross-validation helps prevent overfitting by testing on multiple data splits. Feature \
         engineering is crucial for improving model performance. Regularization techniques like \
         L1 and L2 help prevent overfitting. Ensemble methods combine multiple models for better predictions.",
    ),
    (
        "Cooking Italian Pasta",
        "Cooking perfect pasta requires attention to detail and timing. Start by bringing a large \
         pot of salted water to a rolling boil. Use about 4-6 quarts of water per pound of pasta. \
         Add the pasta and stir immediately to prevent sticking. Cook according to package directions, \
         but taste a minute or two before the suggested time. Perfect pasta should be al dente, \
         meaning it has a slight bite to it. Always reserve a cup of pasta water before draining. \
         This starchy water is essential for creating silky sauces. Carbonara is made with eggs, \
         pecorino cheese, guanciale, and black pepper. Marinara sauce combines tomatoes, garlic, \
         olive oil, and fresh basil. Aglio e olio is a simple dish with garlic, olive oil, and chili flakes.",
    ),
    (
        "Climate Change Science",
        "Climate change refers to long-term shifts in global temperatures and weather patterns. \
         Human activities, particularly burning fossil fuels, release greenhouse gases into the \
         atmosphere. Carbon dioxide, methane, and nitrous oxide trap heat and warm the planet. \
         The global average temperature has increased by about 1.1°C since pre-industrial times. \
         Rising temperatures cause glaciers to melt, sea levels to rise, and extreme weather events \
         to become more frequent. The Paris Agreement aims to limit warming to well below 2°C. \
         Renewable energy sources like solar and wind power can help reduce emissions. Forests \
         act as carbon sinks, absorbing CO2 from the atmosphere. Ocean acidification threatens \
         marine ecosystems. Adaptation strategies help communities cope with climate impacts.",
    ),
    (
        "Ancient Roman History",
        "Ancient Rome began as a small settlement on the Tiber River around 753 BCE. The Roman \
         Kingdom was followed by the Roman Republic in 509 BCE. Julius Caesar played a crucial \
         role in the transition to the Roman Empire. Augustus became the first Roman Emperor in \
         27 BCE, beginning the Pax Romana. The Roman Empire expanded across Europe, North Africa, \
         and the Middle East. Roman engineering marvels included aqueducts, roads, and the Colosseum. \
         Latin was the language of government and education. Roman law influenced modern legal \
         systems worldwide. The empire split into Eastern and Western halves in 395 CE. The Western \
         Roman Empire fell in 476 CE, while the Eastern Byzantine Empire continued for another millennium.",
    ),
    (
        "Quantum Computing Fundamentals",
        "Quantum computing harnesses quantum mechanical phenomena to process information. Unlike \
         classical bits that are either 0 or 1, qubits can exist in superposition of both states. \
         Quantum entanglement allows qubits to be correlated in ways impossible for classical bits. \
         Quantum gates manipulate qubits to perform calculations. Shor's algorithm can factor \
         large numbers exponentially faster than classical algorithms. Grover's algorithm provides \
         quadratic speedup for searching unsorted databases. Quantum computers excel at optimization \
         problems, cryptography, and simulating quantum systems. Quantum decoherence is a major \
         challenge, as qubits are sensitive to environmental noise. Error correction codes help \
         maintain quantum information. Companies like IBM, Google, and IonQ are developing quantum hardware.",
    ),
];
